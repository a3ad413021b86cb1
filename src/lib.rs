use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod capture;
pub mod codec;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod mask;
pub mod ocr;
mod paths;
pub mod render;
pub mod settings;
mod test_util;

pub use capture::{CaptureOptions, CapturePalette, LineSurface, Surface, run_capture};
pub use codec::{FileCodec, ImageCodec};
pub use engine::{IdSummary, MaskEngine, OverlayStyle, ProcessingResult};
pub use error::MaskError;
pub use geometry::{Point, Rect, ScaleContext};
pub use mask::{Label, RegionSet, load_mask, save_mask};
pub use ocr::{IdExtraction, OcrEngine, TesseractEngine};
pub use settings::{Settings, load_settings};

/// Capture options (preview height, colors, label font) from settings.
pub fn capture_options(settings: &Settings, initial: Option<RegionSet>) -> Result<CaptureOptions> {
    Ok(CaptureOptions {
        max_preview_height: settings.max_preview_height,
        palette: CapturePalette {
            face: settings.face_color.clone(),
            id: settings.id_color.clone(),
        },
        font: label_font(settings)?,
        initial,
    })
}

pub fn build_engine(settings: &Settings) -> Result<MaskEngine<TesseractEngine>> {
    let style = OverlayStyle {
        alpha: settings.overlay_alpha,
        highlight_color: settings.highlight_color.clone(),
    };
    let ocr = TesseractEngine::new(settings.ocr_languages.clone(), settings.ocr_psm);
    Ok(MaskEngine::new(ocr, style, label_font(settings)?))
}

fn label_font(settings: &Settings) -> Result<render::LabelFont> {
    render::resolve_label_font(settings.font_path.as_deref(), settings.font_family.as_deref())
}

/// Captures a mask over `image_path` and saves it to `mask_path` on commit.
pub fn capture_and_save<S: Surface + ?Sized>(
    image_path: &Path,
    mask_path: &Path,
    options: CaptureOptions,
    surface: &mut S,
) -> Result<Option<RegionSet>> {
    let regions = run_capture(image_path, &FileCodec, options, surface)?;
    if let Some(regions) = regions.as_ref() {
        save_mask(mask_path, regions)?;
    }
    Ok(regions)
}

/// Destination files for the overlay and the face crop.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub overlay: PathBuf,
    pub face: PathBuf,
}

/// Loads the mask at `mask_path`, applies it to `image_path` and optionally
/// writes the overlay and face crop.
pub fn process_image<E: OcrEngine>(
    engine: &MaskEngine<E>,
    image_path: &Path,
    mask_path: &Path,
    outputs: Option<&OutputPaths>,
) -> Result<ProcessingResult> {
    let regions = load_mask(mask_path)?.ok_or_else(|| {
        anyhow!(
            "no mask configuration found at {}; create one with `capture` first",
            mask_path.display()
        )
    })?;
    let source = FileCodec.decode(image_path)?;
    let result = engine
        .process(&source, &regions)
        .with_context(|| format!("failed to process {}", image_path.display()))?;
    if let Some(outputs) = outputs {
        result.save(&FileCodec, &outputs.overlay, &outputs.face)?;
    }
    info!(
        "processed {} (primary id: {})",
        image_path.display(),
        result.ocr.primary_id.as_deref().unwrap_or("none")
    );
    Ok(result)
}

/// Human-readable report of the extracted ID information.
pub fn format_report(result: &ProcessingResult) -> String {
    let ocr = &result.ocr;
    let mut lines = Vec::new();
    lines.push("=== Extracted ID Information ===".to_string());
    lines.push(format!("Raw OCR Text: {}", ocr.raw_text));
    lines.push(format!("Detected ID Numbers: {:?}", ocr.candidate_ids));
    lines.push(format!(
        "Primary ID: {}",
        ocr.primary_id.as_deref().unwrap_or("None")
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage};

    struct Canned;

    impl OcrEngine for Canned {
        fn recognize(&self, _image: &GrayImage) -> error::Result<String> {
            Ok("name:\nID 1234567".to_string())
        }
    }

    fn engine() -> MaskEngine<Canned> {
        MaskEngine::new(Canned, OverlayStyle::default(), render::LabelFont::empty())
    }

    #[test]
    fn report_lists_candidates() {
        let result = ProcessingResult {
            ocr: IdExtraction::from_text("ID1234567 -"),
            face_rect: Rect::new(0, 0, 1, 1),
            id_rect: Rect::new(0, 0, 1, 1),
            overlay: RgbImage::new(1, 1),
            face_crop: RgbImage::new(1, 1),
        };
        let report = format_report(&result);
        assert!(report.contains("Detected ID Numbers: [\"ID1234567\"]"));
        assert!(report.contains("Primary ID: ID1234567"));
    }

    #[test]
    fn process_image_requires_a_mask_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let card = dir.path().join("card.png");
        RgbImage::from_pixel(20, 20, Rgb([100, 100, 100]))
            .save(&card)
            .expect("write card");
        let err = process_image(&engine(), &card, &dir.path().join("mask.json"), None)
            .expect_err("should fail");
        assert!(err.to_string().contains("no mask configuration found"));
    }

    #[test]
    fn process_image_rejects_incomplete_mask() {
        let dir = tempfile::tempdir().expect("tempdir");
        let card = dir.path().join("card.png");
        RgbImage::from_pixel(20, 20, Rgb([100, 100, 100]))
            .save(&card)
            .expect("write card");
        let mask = dir.path().join("mask.json");
        save_mask(&mask, &RegionSet::new(Some(Rect::new(0, 0, 5, 5)), None)).expect("save");
        let err = process_image(&engine(), &card, &mask, None).expect_err("should fail");
        assert!(matches!(
            err.downcast_ref::<MaskError>(),
            Some(MaskError::MissingMask { label: Label::Id })
        ));
    }

    #[test]
    fn process_image_writes_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let card = dir.path().join("card.png");
        RgbImage::from_pixel(200, 150, Rgb([100, 110, 120]))
            .save(&card)
            .expect("write card");
        let mask = dir.path().join("mask.json");
        save_mask(
            &mask,
            &RegionSet::new(Some(Rect::new(10, 10, 50, 50)), Some(Rect::new(100, 100, 80, 20))),
        )
        .expect("save");
        let outputs = OutputPaths {
            overlay: dir.path().join("masked.png"),
            face: dir.path().join("face.png"),
        };
        let result = process_image(&engine(), &card, &mask, Some(&outputs)).expect("process");
        assert_eq!(result.ocr.primary_id.as_deref(), Some("ID1234567"));
        let face = image::open(&outputs.face).expect("face written");
        assert_eq!((face.width(), face.height()), (50, 50));
        assert!(outputs.overlay.exists());
    }
}
