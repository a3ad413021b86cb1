use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::Rect;
use crate::mask::Label;

pub type Result<T> = std::result::Result<T, MaskError>;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image {}: {source}", path.display())]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse mask file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mask is incomplete: {label} region is not set")]
    MissingMask { label: Label },

    #[error("ocr unavailable: {0}")]
    OcrUnavailable(String),

    #[error("{label} region {rect} has no area inside the {width}x{height} image")]
    OutOfBoundsRegion {
        label: Label,
        rect: Rect,
        width: u32,
        height: u32,
    },

    #[error("failed to render marks: {0}")]
    Render(String),
}

impl MaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
