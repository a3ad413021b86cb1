use image::RgbImage;
use std::path::Path;
use tracing::debug;

use crate::error::{MaskError, Result};

/// Reads and writes raster images. Decoded images are always 8-bit RGB.
pub trait ImageCodec {
    fn decode(&self, path: &Path) -> Result<RgbImage>;
    fn encode(&self, image: &RgbImage, path: &Path) -> Result<()>;
}

/// [`ImageCodec`] backed by the `image` crate; the output format follows the
/// file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCodec;

impl ImageCodec for FileCodec {
    fn decode(&self, path: &Path) -> Result<RgbImage> {
        let image = image::open(path).map_err(|source| MaskError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "decoded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(image.to_rgb8())
    }

    fn encode(&self, image: &RgbImage, path: &Path) -> Result<()> {
        image.save(path).map_err(|source| MaskError::ImageEncode {
            path: path.to_path_buf(),
            source,
        })
    }
}
