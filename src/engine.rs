use image::{Rgb, RgbImage, imageops};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::codec::ImageCodec;
use crate::error::{MaskError, Result};
use crate::geometry::Rect;
use crate::mask::{Label, RegionSet};
use crate::ocr::{IdExtraction, OcrEngine, TextExtractor};
use crate::render::{LabelFont, MarkLayer};

pub const DEFAULT_ALPHA: f32 = 0.6;
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#00ff00";

const OUTLINE_WIDTH: f32 = 2.0;
const LABEL_OFFSET: i32 = 10;
const LABEL_FONT_SIZE: f32 = 18.0;

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    /// Weight of the source image in the final blend; the marked canvas gets
    /// `1 - alpha`.
    pub alpha: f32,
    pub highlight_color: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub ocr: IdExtraction,
    pub face_rect: Rect,
    pub id_rect: Rect,
    pub overlay: RgbImage,
    pub face_crop: RgbImage,
}

/// Pixel-free view of a [`ProcessingResult`] for printing or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct IdSummary<'a> {
    pub raw_text: &'a str,
    pub id_numbers: &'a [String],
    pub primary_id: Option<&'a str>,
    pub face_rect: Rect,
    pub id_rect: Rect,
}

impl ProcessingResult {
    pub fn summary(&self) -> IdSummary<'_> {
        IdSummary {
            raw_text: &self.ocr.raw_text,
            id_numbers: &self.ocr.candidate_ids,
            primary_id: self.ocr.primary_id.as_deref(),
            face_rect: self.face_rect,
            id_rect: self.id_rect,
        }
    }

    pub fn save<C: ImageCodec + ?Sized>(
        &self,
        codec: &C,
        overlay_path: &Path,
        face_path: &Path,
    ) -> Result<()> {
        codec.encode(&self.overlay, overlay_path)?;
        codec.encode(&self.face_crop, face_path)?;
        info!(
            "saved overlay {} and face crop {}",
            overlay_path.display(),
            face_path.display()
        );
        Ok(())
    }
}

/// Applies a committed mask to a source image: redacted overlay, face crop
/// and OCR of the ID field.
pub struct MaskEngine<E> {
    extractor: TextExtractor<E>,
    style: OverlayStyle,
    font: LabelFont,
}

impl<E: OcrEngine> MaskEngine<E> {
    pub fn new(engine: E, style: OverlayStyle, font: LabelFont) -> Self {
        Self {
            extractor: TextExtractor::new(engine),
            style,
            font,
        }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn process(&self, source: &RgbImage, regions: &RegionSet) -> Result<ProcessingResult> {
        let face_rect = clamp_region(source, Label::Face, regions.require(Label::Face)?)?;
        let id_rect = clamp_region(source, Label::Id, regions.require(Label::Id)?)?;

        let overlay = self.overlay(source, face_rect, id_rect)?;
        let ocr = self.extractor.extract(source, id_rect)?;
        let face_crop = crop(source, face_rect);

        Ok(ProcessingResult {
            ocr,
            face_rect,
            id_rect,
            overlay,
            face_crop,
        })
    }

    /// Black canvas with both regions copied in (face first, then id), outlined
    /// and labelled, then blended with the source.
    pub fn overlay(&self, source: &RgbImage, face_rect: Rect, id_rect: Rect) -> Result<RgbImage> {
        let (width, height) = source.dimensions();
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
        copy_region(&mut canvas, source, face_rect);
        copy_region(&mut canvas, source, id_rect);

        let mut marks = MarkLayer::new(width, height);
        for (rect, label) in [(face_rect, Label::Face), (id_rect, Label::Id)] {
            marks.outline(rect, &self.style.highlight_color, OUTLINE_WIDTH);
            marks.text(
                rect.x,
                rect.y - LABEL_OFFSET,
                LABEL_FONT_SIZE,
                &self.style.highlight_color,
                self.font.family(),
                label.title(),
            );
        }
        marks.draw_onto(&mut canvas, &self.font)?;

        Ok(blend(source, &canvas, self.style.alpha))
    }
}

fn clamp_region(source: &RgbImage, label: Label, rect: Rect) -> Result<Rect> {
    let (width, height) = source.dimensions();
    let clamped = rect
        .clamp_to(width, height)
        .ok_or(MaskError::OutOfBoundsRegion {
            label,
            rect,
            width,
            height,
        })?;
    if clamped != rect {
        tracing::warn!("{} region {} clamped to {}", label, rect, clamped);
    }
    Ok(clamped)
}

fn copy_region(canvas: &mut RgbImage, source: &RgbImage, rect: Rect) {
    let x0 = rect.x as u32;
    let y0 = rect.y as u32;
    for y in y0..y0 + rect.height as u32 {
        for x in x0..x0 + rect.width as u32 {
            canvas.put_pixel(x, y, *source.get_pixel(x, y));
        }
    }
}

fn crop(source: &RgbImage, rect: Rect) -> RgbImage {
    imageops::crop_imm(
        source,
        rect.x as u32,
        rect.y as u32,
        rect.width as u32,
        rect.height as u32,
    )
    .to_image()
}

/// `source * alpha + canvas * (1 - alpha)`, rounded and saturated per channel.
fn blend(source: &RgbImage, canvas: &RgbImage, alpha: f32) -> RgbImage {
    let alpha = alpha.clamp(0.0, 1.0);
    let beta = 1.0 - alpha;
    RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let src = source.get_pixel(x, y);
        let dst = canvas.get_pixel(x, y);
        let mix = |c: usize| {
            (src[c] as f32 * alpha + dst[c] as f32 * beta)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([mix(0), mix(1), mix(2)])
    })
}
