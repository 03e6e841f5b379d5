//! Color/precision collaborator interface.
//!
//! The actual transform kernels (YCC-family to RGB, CMYK to RGB) and the
//! bit-depth rescale primitive are external; the pipeline only decides when
//! to invoke them.

use crate::error::Jp2Error;
use crate::image::{ComponentPlane, DecodedImage};

/// External color-transform and precision-rescale kernels.
pub trait ColorTransforms {
    /// Rescale a plane's samples from its native precision to 8 bits,
    /// in place. The pipeline guarantees at most one call per plane per
    /// decoded window; a second call would double-rescale.
    fn rescale_to_8bit(&self, plane: &mut ComponentPlane);

    /// Convert sYCC planes to full-resolution RGB, upsampling subsampled
    /// chroma. Afterwards the image holds three 1:1 planes.
    fn sycc_to_rgb(&self, image: &mut DecodedImage) -> Result<(), Jp2Error>;

    /// Convert CMYK planes to RGB. Afterwards the image holds three planes.
    fn cmyk_to_rgb(&self, image: &mut DecodedImage) -> Result<(), Jp2Error>;

    /// Convert extended-sYCC planes to RGB.
    fn esycc_to_rgb(&self, image: &mut DecodedImage) -> Result<(), Jp2Error>;
}
