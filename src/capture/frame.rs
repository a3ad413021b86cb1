use image::RgbImage;

use super::session::CaptureSession;
use crate::error::Result;
use crate::mask::Label;
use crate::render::{LabelFont, MarkLayer};

const OUTLINE_WIDTH: f32 = 2.0;
const LABEL_FONT_SIZE: f32 = 16.0;
const LEGEND_FONT_SIZE: f32 = 13.0;
const LEGEND_X: i32 = 10;
const LEGEND_TOP: i32 = 30;
const LEGEND_STEP: i32 = 25;
const LEGEND_COLOR: &str = "#ffffff";
const WARNING_COLOR: &str = "#ff3030";

pub const DEFAULT_FACE_COLOR: &str = "#00ff00";
pub const DEFAULT_ID_COLOR: &str = "#0000ff";

const HELP_LINES: [&str; 6] = [
    "Draw rectangle around area",
    "Press 'F' for Face mode",
    "Press 'I' for ID mode",
    "Press 'R' to reset current",
    "Press 'S' to save & continue",
    "Press 'Q' to quit",
];

#[derive(Debug, Clone)]
pub struct CapturePalette {
    pub face: String,
    pub id: String,
}

impl CapturePalette {
    pub fn color(&self, label: Label) -> &str {
        match label {
            Label::Face => &self.face,
            Label::Id => &self.id,
        }
    }
}

impl Default for CapturePalette {
    fn default() -> Self {
        Self {
            face: DEFAULT_FACE_COLOR.to_string(),
            id: DEFAULT_ID_COLOR.to_string(),
        }
    }
}

/// Draws frames for a capture session over a fixed preview image.
pub struct CaptureRenderer {
    preview: RgbImage,
    palette: CapturePalette,
    font: LabelFont,
}

impl CaptureRenderer {
    pub fn new(preview: RgbImage, palette: CapturePalette, font: LabelFont) -> Self {
        Self {
            preview,
            palette,
            font,
        }
    }

    pub fn preview(&self) -> &RgbImage {
        &self.preview
    }

    /// Pure function of the session; may be called for every pointer move.
    pub fn render(&self, session: &CaptureSession) -> Result<RgbImage> {
        let mut frame = self.preview.clone();
        let (width, height) = frame.dimensions();
        let mut marks = MarkLayer::new(width, height);
        let scale = session.scale();

        for label in Label::ALL {
            let Some(rect) = session.regions().get(label) else {
                continue;
            };
            let display = scale.to_display(rect);
            let color = self.palette.color(label);
            marks.outline(display, color, OUTLINE_WIDTH);
            marks.text(
                display.x,
                display.y - 5,
                LABEL_FONT_SIZE,
                color,
                self.font.family(),
                region_caption(label),
            );
        }

        if let Some(pending) = session.pending_rect() {
            marks.outline(pending, self.palette.color(session.mode()), OUTLINE_WIDTH);
        }

        for (idx, line) in legend_lines(session.mode()).iter().enumerate() {
            let color = if idx == 0 {
                self.palette.color(session.mode())
            } else {
                LEGEND_COLOR
            };
            marks.text(
                LEGEND_X,
                LEGEND_TOP + idx as i32 * LEGEND_STEP,
                LEGEND_FONT_SIZE,
                color,
                self.font.family(),
                line,
            );
        }

        if let Some(warning) = session.warning() {
            marks.text(
                LEGEND_X,
                height as i32 - 12,
                LEGEND_FONT_SIZE,
                WARNING_COLOR,
                self.font.family(),
                warning,
            );
        }

        marks.draw_onto(&mut frame, &self.font)?;
        Ok(frame)
    }
}

fn region_caption(label: Label) -> &'static str {
    match label {
        Label::Face => "FACE",
        Label::Id => "ID NUMBER",
    }
}

pub(crate) fn legend_lines(mode: Label) -> Vec<String> {
    let color_name = match mode {
        Label::Face => "GREEN",
        Label::Id => "BLUE",
    };
    let mut lines = vec![format!("Mode: {} ({})", mode.title(), color_name)];
    lines.extend(HELP_LINES.iter().map(|line| line.to_string()));
    lines
}
