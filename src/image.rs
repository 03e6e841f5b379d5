//! Decoded-image data model shared with the engine collaborator.

use alloc::vec::Vec;

use crate::color::ColorSpace;

/// One channel's grid of decoded integer samples.
///
/// Produced and filled by the decode engine; the pipeline only reads it,
/// except that the rescale collaborator rewrites `data` in place when
/// normalizing precision to 8 bits.
#[derive(Clone, Debug, Default)]
pub struct ComponentPlane {
    /// Decoded samples, row-major, `width * height` entries.
    pub data: Vec<i32>,
    /// Plane width in samples (after subsampling).
    pub width: u32,
    /// Plane height in samples (after subsampling).
    pub height: u32,
    /// Horizontal subsampling factor.
    pub dx: u32,
    /// Vertical subsampling factor.
    pub dy: u32,
    /// Native bit precision of the samples.
    pub prec: u8,
    /// Whether the native samples are signed.
    pub signed: bool,
}

impl ComponentPlane {
    /// Sample count this plane currently holds.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Image descriptor plus component planes, as handed back by the engine's
/// header read and refilled by each region decode.
#[derive(Clone, Debug, Default)]
pub struct DecodedImage {
    /// Image area bounds on the reference grid.
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    /// Declared (or engine-inferred) color space.
    pub color_space: ColorSpace,
    /// Component planes, in codestream order.
    pub comps: Vec<ComponentPlane>,
    /// ICC profile from the container, if any. Engine-owned in the original
    /// C API and not released by codec teardown; here the pipeline takes and
    /// drops it before returning so the field is `None` afterwards.
    pub icc_profile: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Number of component planes.
    pub fn numcomps(&self) -> usize {
        self.comps.len()
    }

    /// Release the ICC profile buffer, leaving the field empty.
    pub(crate) fn release_icc_profile(&mut self) {
        if let Some(icc) = self.icc_profile.take() {
            ldebug!("released {}-byte ICC profile", icc.len());
            drop(icc);
        }
    }
}
