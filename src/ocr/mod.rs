mod preprocess;
mod tesseract;

use image::{GrayImage, RgbImage, imageops};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::geometry::Rect;

pub use tesseract::{DEFAULT_OCR_LANGUAGES, DEFAULT_PSM, TesseractEngine, list_tesseract_languages};

/// Minimum length of an uppercase/digit run to count as a candidate ID.
pub const MIN_CANDIDATE_LEN: usize = 5;

/// Black-box text recognition over a preprocessed, single-channel image.
pub trait OcrEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for &E {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        (**self).recognize(image)
    }
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        (**self).recognize(image)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdExtraction {
    pub raw_text: String,
    pub candidate_ids: Vec<String>,
    pub primary_id: Option<String>,
}

impl IdExtraction {
    pub fn from_text(text: &str) -> Self {
        let candidate_ids = candidate_ids(text);
        let primary_id = candidate_ids.first().cloned();
        Self {
            raw_text: text.trim().to_string(),
            candidate_ids,
            primary_id,
        }
    }
}

pub struct TextExtractor<E> {
    engine: E,
}

impl<E: OcrEngine> TextExtractor<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs OCR on `id_rect`, which must already be clamped to `source`.
    pub fn extract(&self, source: &RgbImage, id_rect: Rect) -> Result<IdExtraction> {
        let region = imageops::crop_imm(
            source,
            id_rect.x.max(0) as u32,
            id_rect.y.max(0) as u32,
            id_rect.width.max(0) as u32,
            id_rect.height.max(0) as u32,
        )
        .to_image();
        let binary = preprocess::binarize_for_ocr(&region);
        let text = self.engine.recognize(&binary)?;
        let extraction = IdExtraction::from_text(&text);
        info!(
            "ocr found {} candidate id(s), primary={:?}",
            extraction.candidate_ids.len(),
            extraction.primary_id
        );
        Ok(extraction)
    }
}

/// Maximal runs of `[A-Z0-9]` at least [`MIN_CANDIDATE_LEN`] long, taken from
/// the text with all whitespace removed, in order of appearance.
pub fn candidate_ids(text: &str) -> Vec<String> {
    let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    let mut candidates = Vec::new();
    let mut current = String::new();
    for ch in compact.chars() {
        if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
            current.push(ch);
            continue;
        }
        if current.len() >= MIN_CANDIDATE_LEN {
            candidates.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.len() >= MIN_CANDIDATE_LEN {
        candidates.push(current);
    }
    candidates
}
