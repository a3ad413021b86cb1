mod font;

use image::RgbImage;
use resvg::render;
use tiny_skia::Pixmap;
use usvg::{Options, Tree};

use crate::error::{MaskError, Result};
use crate::geometry::Rect;

pub use font::{LabelFont, resolve_label_font};

/// Transparent SVG layer of outlines and labels, rasterized and composited
/// over an RGB buffer of the same size.
pub(crate) struct MarkLayer {
    width: u32,
    height: u32,
    body: String,
}

impl MarkLayer {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            body: String::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Outline centred on the rectangle edge, as wide as `stroke_width`.
    pub(crate) fn outline(&mut self, rect: Rect, color: &str, stroke_width: f32) {
        self.body.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{stroke}" stroke-width="{sw}"/>"#,
            x = rect.x,
            y = rect.y,
            w = rect.width.max(0),
            h = rect.height.max(0),
            stroke = escape_xml(color),
            sw = stroke_width
        ));
    }

    /// Text whose baseline starts at `(x, y)`.
    pub(crate) fn text(&mut self, x: i32, y: i32, size: f32, color: &str, family: &str, text: &str) {
        self.body.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" font-weight="bold" fill="{color}" font-family="{family}">{text}</text>"#,
            x = x,
            y = y,
            size = size,
            color = escape_xml(color),
            family = escape_xml(family),
            text = escape_xml(text)
        ));
    }

    pub(crate) fn to_svg(&self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#,
            w = self.width,
            h = self.height,
            body = self.body
        )
    }

    pub(crate) fn rasterize(&self, font: &LabelFont) -> Result<Pixmap> {
        let options = Options {
            fontdb: font.database(),
            ..Options::default()
        };
        let tree = Tree::from_str(&self.to_svg(), &options)
            .map_err(|err| MaskError::Render(format!("invalid mark layer: {}", err)))?;
        let mut pixmap = Pixmap::new(self.width, self.height)
            .ok_or_else(|| MaskError::Render("empty mark layer size".to_string()))?;
        let mut pixmap_mut = pixmap.as_mut();
        render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
        Ok(pixmap)
    }

    /// Rasterizes the layer and draws it over `target` with source-over
    /// blending.
    pub(crate) fn draw_onto(&self, target: &mut RgbImage, font: &LabelFont) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        if target.dimensions() != (self.width, self.height) {
            return Err(MaskError::Render(format!(
                "layer is {}x{} but target is {}x{}",
                self.width,
                self.height,
                target.width(),
                target.height()
            )));
        }
        let pixmap = self.rasterize(font)?;
        composite(target, &pixmap);
        Ok(())
    }
}

/// Source-over of a premultiplied RGBA pixmap onto an opaque RGB image.
fn composite(target: &mut RgbImage, layer: &Pixmap) {
    let data = layer.data();
    for (idx, pixel) in target.pixels_mut().enumerate() {
        let offset = idx * 4;
        let Some(src) = data.get(offset..offset + 4) else {
            break;
        };
        let alpha = src[3] as u32;
        if alpha == 0 {
            continue;
        }
        let inverse = 255 - alpha;
        for channel in 0..3 {
            let dst = pixel[channel] as u32;
            let value = src[channel] as u32 + (dst * inverse + 127) / 255;
            pixel[channel] = value.min(255) as u8;
        }
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn outline_is_drawn_on_the_edge_only() {
        let mut target = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        let mut layer = MarkLayer::new(40, 40);
        layer.outline(Rect::new(10, 10, 20, 20), "#00ff00", 2.0);
        layer.draw_onto(&mut target, &LabelFont::empty()).expect("draw");

        for x in [9, 10] {
            let pixel = target.get_pixel(x, 20);
            assert!(pixel[1] > 200, "column {} not outlined: {:?}", x, pixel);
            assert_eq!((pixel[0], pixel[2]), (0, 0));
        }
        assert_eq!(target.get_pixel(20, 20), &Rgb([0, 0, 0]));
        assert_eq!(target.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }

    #[test]
    fn empty_layer_leaves_target_untouched() {
        let mut target = RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]));
        let layer = MarkLayer::new(8, 8);
        layer.draw_onto(&mut target, &LabelFont::empty()).expect("draw");
        assert!(target.pixels().all(|p| *p == Rgb([9, 9, 9])));
    }

    #[test]
    fn layer_size_must_match_target() {
        let mut target = RgbImage::new(8, 8);
        let mut layer = MarkLayer::new(4, 4);
        layer.outline(Rect::new(0, 0, 2, 2), "#ffffff", 1.0);
        let err = layer.draw_onto(&mut target, &LabelFont::empty()).expect_err("mismatch");
        assert!(matches!(err, MaskError::Render(_)));
    }

    #[test]
    fn label_text_is_rasterized_with_resolved_font() {
        let font = resolve_label_font(None, Some("sans-serif")).expect("installed font");
        let mut target = RgbImage::from_pixel(120, 40, Rgb([0, 0, 0]));
        let mut layer = MarkLayer::new(120, 40);
        layer.text(5, 30, 18.0, "#00ff00", font.family(), "FACE");
        layer.draw_onto(&mut target, &font).expect("draw");
        let lit = target.pixels().filter(|p| p[1] > 100).count();
        assert!(lit > 20, "only {} label pixels", lit);
    }

    #[test]
    fn labels_are_escaped() {
        let mut layer = MarkLayer::new(10, 10);
        layer.text(0, 5, 10.0, "#fff", "A&B", "<ID>");
        let svg = layer.to_svg();
        assert!(svg.contains("&lt;ID&gt;"));
        assert!(svg.contains("A&amp;B"));
    }
}
