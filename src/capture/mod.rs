mod frame;
mod session;
mod surface;

use image::imageops::{self, FilterType};
use std::path::Path;
use tracing::info;

use crate::codec::ImageCodec;
use crate::error::Result;
use crate::geometry::{DEFAULT_MAX_PREVIEW_HEIGHT, ScaleContext};
use crate::mask::RegionSet;
use crate::render::LabelFont;

pub use frame::{CapturePalette, CaptureRenderer, DEFAULT_FACE_COLOR, DEFAULT_ID_COLOR};
pub use session::{CaptureSession, Command, DragState, Event, Transition};
pub use surface::{LineSurface, Surface};

pub struct CaptureOptions {
    pub max_preview_height: u32,
    pub palette: CapturePalette,
    pub font: LabelFont,
    /// Regions to start from instead of an empty set.
    pub initial: Option<RegionSet>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            max_preview_height: DEFAULT_MAX_PREVIEW_HEIGHT,
            palette: CapturePalette::default(),
            font: LabelFont::empty(),
            initial: None,
        }
    }
}

/// Runs an interactive capture over `image_path`.
///
/// Returns the committed regions, or `None` when the operator aborts or the
/// surface runs out of input.
pub fn run_capture<C, S>(
    image_path: &Path,
    codec: &C,
    options: CaptureOptions,
    surface: &mut S,
) -> Result<Option<RegionSet>>
where
    C: ImageCodec + ?Sized,
    S: Surface + ?Sized,
{
    let source = codec.decode(image_path)?;
    let (width, height) = source.dimensions();
    let scale = ScaleContext::new(width, height, options.max_preview_height);
    let preview = if scale.is_identity() {
        source
    } else {
        imageops::resize(
            &source,
            scale.display_width,
            scale.display_height,
            FilterType::Triangle,
        )
    };
    info!(
        "capturing {} ({}x{}, preview {}x{})",
        image_path.display(),
        width,
        height,
        scale.display_width,
        scale.display_height
    );

    let renderer = CaptureRenderer::new(preview, options.palette, options.font);
    let mut session = match options.initial {
        Some(regions) => CaptureSession::with_regions(scale, regions),
        None => CaptureSession::new(scale),
    };
    loop {
        surface.present(&renderer.render(&session)?)?;
        let Some(event) = surface.next_event()? else {
            info!("capture input ended without commit");
            return Ok(None);
        };
        session = match session.handle(event) {
            Transition::Continue(next) => next,
            Transition::Committed(regions) => {
                info!("capture committed");
                return Ok(Some(regions));
            }
            Transition::Aborted => {
                info!("capture aborted");
                return Ok(None);
            }
        };
    }
}
