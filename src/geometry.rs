use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MAX_PREVIEW_HEIGHT: u32 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in source-image pixels.
///
/// Persisted as the tuple `[x, y, width, height]`. The origin may lie outside
/// the image when the operator dragged past the canvas edge, so pixel access
/// must go through [`Rect::clamp_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounding rectangle of two drag corners, independent of drag direction.
    /// Extents wider than `i32::MAX` saturate.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x_min = a.x.min(b.x);
        let y_min = a.y.min(b.y);
        Self::new(x_min, y_min, span(a.x, b.x), span(a.y, b.y))
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersection with `[0, width) x [0, height)`, or `None` if nothing with
    /// positive area is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let max_x = i32::try_from(width).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height).unwrap_or(i32::MAX);
        let x1 = self.x.clamp(0, max_x);
        let y1 = self.y.clamp(0, max_y);
        let x2 = self.right().clamp(0, max_x);
        let y2 = self.bottom().clamp(0, max_y);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

fn span(a: i32, b: i32) -> i32 {
    let distance = (a as i64 - b as i64).abs();
    i32::try_from(distance).unwrap_or(i32::MAX)
}

impl From<[i32; 4]> for Rect {
    fn from(value: [i32; 4]) -> Self {
        let [x, y, width, height] = value;
        Rect::new(x, y, width, height)
    }
}

impl From<Rect> for [i32; 4] {
    fn from(rect: Rect) -> Self {
        [rect.x, rect.y, rect.width, rect.height]
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Mapping between the preview shown to the operator and the source image.
///
/// Derived once per capture session. `to_source` divides and floors while
/// `to_display` multiplies and floors, so a round trip through both is lossy
/// whenever `scale != 1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleContext {
    pub scale: f64,
    pub display_width: u32,
    pub display_height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

impl ScaleContext {
    pub fn new(source_width: u32, source_height: u32, max_height: u32) -> Self {
        if source_height <= max_height || max_height == 0 {
            return Self {
                scale: 1.0,
                display_width: source_width,
                display_height: source_height,
                source_width,
                source_height,
            };
        }
        let scale = max_height as f64 / source_height as f64;
        let display_width = ((source_width as f64 * scale).round() as u32).max(1);
        let display_height = ((source_height as f64 * scale).round() as u32).max(1);
        Self {
            scale,
            display_width,
            display_height,
            source_width,
            source_height,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0
    }

    pub fn to_source(&self, point: Point) -> Point {
        Point::new(self.div(point.x), self.div(point.y))
    }

    pub fn to_source_rect(&self, rect: Rect) -> Rect {
        Rect::new(
            self.div(rect.x),
            self.div(rect.y),
            self.div(rect.width),
            self.div(rect.height),
        )
    }

    pub fn to_display(&self, rect: Rect) -> Rect {
        Rect::new(
            self.mul(rect.x),
            self.mul(rect.y),
            self.mul(rect.width),
            self.mul(rect.height),
        )
    }

    fn div(&self, value: i32) -> i32 {
        (value as f64 / self.scale).floor() as i32
    }

    fn mul(&self, value: i32) -> i32 {
        (value as f64 * self.scale).floor() as i32
    }
}
