use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::{DEFAULT_FACE_COLOR, DEFAULT_ID_COLOR};
use crate::engine::{DEFAULT_ALPHA, DEFAULT_HIGHLIGHT_COLOR};
use crate::geometry::DEFAULT_MAX_PREVIEW_HEIGHT;
use crate::mask::DEFAULT_MASK_PATH;
use crate::ocr::{DEFAULT_OCR_LANGUAGES, DEFAULT_PSM};
use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mask_path: PathBuf,
    pub max_preview_height: u32,
    pub preview_path: Option<PathBuf>,
    pub face_color: String,
    pub id_color: String,
    pub overlay_alpha: f32,
    pub highlight_color: String,
    pub font_family: Option<String>,
    pub font_path: Option<PathBuf>,
    pub overlay_output_path: PathBuf,
    pub face_output_path: PathBuf,
    pub ocr_languages: String,
    pub ocr_psm: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mask_path: PathBuf::from(DEFAULT_MASK_PATH),
            max_preview_height: DEFAULT_MAX_PREVIEW_HEIGHT,
            preview_path: Some(PathBuf::from("mask_preview.png")),
            face_color: DEFAULT_FACE_COLOR.to_string(),
            id_color: DEFAULT_ID_COLOR.to_string(),
            overlay_alpha: DEFAULT_ALPHA,
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            font_family: None,
            font_path: None,
            overlay_output_path: PathBuf::from("id_card_masked.jpg"),
            face_output_path: PathBuf::from("face_extracted.jpg"),
            ocr_languages: DEFAULT_OCR_LANGUAGES.to_string(),
            ocr_psm: DEFAULT_PSM,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    mask: Option<MaskSettings>,
    capture: Option<CaptureSettings>,
    overlay: Option<OverlaySettings>,
    ocr: Option<OcrSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct MaskSettings {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CaptureSettings {
    max_preview_height: Option<u32>,
    preview_path: Option<String>,
    face_color: Option<String>,
    id_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    alpha: Option<f32>,
    highlight_color: Option<String>,
    font_family: Option<String>,
    font_path: Option<String>,
    output_path: Option<String>,
    face_output_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    languages: Option<String>,
    psm: Option<u32>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = paths::settings_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed = parse_settings(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            tracing::debug!("merged settings from {}", path.display());
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

fn parse_settings(content: &str) -> Result<SettingsFile> {
    Ok(toml::from_str(content)?)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn to_path(value: &str) -> PathBuf {
    PathBuf::from(paths::expand_tilde(value.trim()))
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(mask) = incoming.mask {
            if let Some(path) = non_empty(mask.path) {
                self.mask_path = to_path(&path);
            }
        }
        if let Some(capture) = incoming.capture {
            if let Some(height) = capture.max_preview_height {
                if height > 0 {
                    self.max_preview_height = height;
                }
            }
            if let Some(path) = capture.preview_path {
                self.preview_path = if path.trim().is_empty() {
                    None
                } else {
                    Some(to_path(&path))
                };
            }
            if let Some(color) = non_empty(capture.face_color) {
                self.face_color = color;
            }
            if let Some(color) = non_empty(capture.id_color) {
                self.id_color = color;
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(alpha) = overlay.alpha {
                if (0.0..=1.0).contains(&alpha) {
                    self.overlay_alpha = alpha;
                } else {
                    tracing::warn!("ignoring overlay alpha {} outside 0..=1", alpha);
                }
            }
            if let Some(color) = non_empty(overlay.highlight_color) {
                self.highlight_color = color;
            }
            if let Some(family) = non_empty(overlay.font_family) {
                self.font_family = Some(family);
            }
            if let Some(path) = non_empty(overlay.font_path) {
                self.font_path = Some(to_path(&path));
            }
            if let Some(path) = non_empty(overlay.output_path) {
                self.overlay_output_path = to_path(&path);
            }
            if let Some(path) = non_empty(overlay.face_output_path) {
                self.face_output_path = to_path(&path);
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(languages) = non_empty(ocr.languages) {
                self.ocr_languages = languages;
            }
            if let Some(psm) = ocr.psm {
                self.ocr_psm = psm;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = paths::settings_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}
