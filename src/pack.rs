//! Channel interleaving into tightly packed 8-bit output.
//!
//! All indexing is bounds-checked slice access keyed by the shared pixel
//! range; byte sizes are computed with checked arithmetic so untrusted
//! width/height can't overflow a `count * channels` product.

use core::ops::Range;

use crate::color::{ColorPlan, ColorSpace};
use crate::error::Jp2Error;

/// Opaque alpha synthesized when the source has no alpha plane.
const OPAQUE: u8 = 0xFF;

/// Interleave the planes' samples for `range` into `out`.
///
/// `range` indexes into the planes (every consumed plane must cover it) and
/// `out` must be exactly `range.len() * plan.channels` bytes. Samples are
/// taken low-byte only; rescaling to 8 bits (or raw palette indices) is the
/// caller's responsibility.
pub fn pack_window(
    planes: &[&[i32]],
    plan: &ColorPlan,
    range: Range<usize>,
    out: &mut [u8],
) -> Result<(), Jp2Error> {
    let count = range.len();
    let expected = count
        .checked_mul(plan.channels)
        .ok_or(Jp2Error::PlaneRangeMismatch)?;
    if out.len() != expected || planes.len() < plan.min_planes() {
        return Err(Jp2Error::PlaneRangeMismatch);
    }
    for plane in &planes[..plan.min_planes()] {
        if plane.len() < range.end {
            return Err(Jp2Error::PlaneRangeMismatch);
        }
    }

    if plan.convert_to_rgba {
        match (plan.space, plan.consumed) {
            (ColorSpace::Gray, 1) => gray_to_rgba(planes[0], range, out),
            (ColorSpace::GrayAlpha, 2) => graya_to_rgba(planes[0], planes[1], range, out),
            // Any transformed or RGB-like space: three planes plus
            // synthesized opaque alpha.
            _ => rgb_to_rgba(planes[0], planes[1], planes[2], range, out),
        }
    } else {
        match plan.channels {
            1 => copy_planes::<1>(planes, range, out),
            3 => copy_planes::<3>(planes, range, out),
            4 => copy_planes::<4>(planes, range, out),
            channels => return Err(Jp2Error::UnsupportedComponentCount { channels }),
        }
    }
    Ok(())
}

impl ColorPlan {
    /// How many planes the packer reads for this plan.
    fn min_planes(&self) -> usize {
        if self.convert_to_rgba {
            match (self.space, self.consumed) {
                (ColorSpace::Gray, 1) => 1,
                (ColorSpace::GrayAlpha, 2) => 2,
                _ => 3,
            }
        } else {
            self.channels
        }
    }
}

fn gray_to_rgba(gray: &[i32], range: Range<usize>, out: &mut [u8]) {
    for (dst, i) in out.chunks_exact_mut(4).zip(range) {
        let g = gray[i] as u8;
        dst[0] = g;
        dst[1] = g;
        dst[2] = g;
        dst[3] = OPAQUE;
    }
}

fn graya_to_rgba(gray: &[i32], alpha: &[i32], range: Range<usize>, out: &mut [u8]) {
    for (dst, i) in out.chunks_exact_mut(4).zip(range) {
        let g = gray[i] as u8;
        dst[0] = g;
        dst[1] = g;
        dst[2] = g;
        dst[3] = alpha[i] as u8;
    }
}

fn rgb_to_rgba(r: &[i32], g: &[i32], b: &[i32], range: Range<usize>, out: &mut [u8]) {
    for (dst, i) in out.chunks_exact_mut(4).zip(range) {
        dst[0] = r[i] as u8;
        dst[1] = g[i] as u8;
        dst[2] = b[i] as u8;
        dst[3] = OPAQUE;
    }
}

/// Direct interleave of exactly `N` planes, no synthesized bytes.
fn copy_planes<const N: usize>(planes: &[&[i32]], range: Range<usize>, out: &mut [u8]) {
    for (dst, i) in out.chunks_exact_mut(N).zip(range) {
        for (c, byte) in dst.iter_mut().enumerate() {
            *byte = planes[c][i] as u8;
        }
    }
}
