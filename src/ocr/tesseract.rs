use image::GrayImage;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

use super::OcrEngine;
use crate::error::{MaskError, Result};

pub const DEFAULT_OCR_LANGUAGES: &str = "eng";
/// Page segmentation mode 6: a single uniform block of text.
pub const DEFAULT_PSM: u32 = 6;

/// [`OcrEngine`] that shells out to the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    languages: String,
    psm: u32,
}

impl TesseractEngine {
    pub fn new(languages: impl Into<String>, psm: u32) -> Self {
        Self {
            languages: languages.into(),
            psm,
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    pub fn psm(&self) -> u32 {
        self.psm
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new(DEFAULT_OCR_LANGUAGES, DEFAULT_PSM)
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let languages = normalize_ocr_languages(&self.languages)?;
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|err| MaskError::OcrUnavailable(format!("failed to create temp file: {}", err)))?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .map_err(|err| MaskError::OcrUnavailable(format!("failed to write temp image: {}", err)))?;
        tmp.flush()
            .map_err(|err| MaskError::OcrUnavailable(format!("failed to flush temp image: {}", err)))?;
        debug!(
            "running tesseract on {}x{} region (lang={}, psm={})",
            image.width(),
            image.height(),
            languages,
            self.psm
        );
        run_tesseract_text(tmp.path(), &languages, self.psm)
    }
}

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let output = Command::new("tesseract")
        .arg("--list-langs")
        .output()
        .map_err(|err| {
            MaskError::OcrUnavailable(format!("failed to run tesseract --list-langs: {}", err))
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MaskError::OcrUnavailable(format!(
            "tesseract --list-langs failed: {}",
            stderr.trim()
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_language_list(&stdout))
}

fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_ocr_languages(requested: &str) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(MaskError::OcrUnavailable("ocr languages is empty".to_string()));
    }
    let available = match list_tesseract_languages() {
        Ok(list) => list,
        Err(_) => return Ok(trimmed.to_string()),
    };
    select_languages(trimmed, &available)
}

fn select_languages(requested: &str, available: &[String]) -> Result<String> {
    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for raw in requested.split(['+', ',', ' ']) {
        let lang = raw.trim();
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }

    if chosen.is_empty() {
        return Err(MaskError::OcrUnavailable(format!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        )));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }
    Ok(chosen.join("+"))
}

fn run_tesseract_text(path: &Path, languages: &str, psm: u32) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--psm")
        .arg(psm.to_string())
        .output()
        .map_err(|err| {
            MaskError::OcrUnavailable(format!("failed to run tesseract (is it installed?): {}", err))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MaskError::OcrUnavailable(format!(
            "tesseract failed: {}",
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
