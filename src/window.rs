//! Bounded-memory windowing of the output stream.
//!
//! Two strategies, one pipeline: strip-wise windowing re-runs the decode
//! engine per fixed-height strip (bounding the engine's own working set),
//! while chunked windowing packs an already-decoded image through a
//! bounded output buffer that shrinks on allocation failure. Both tile the
//! output byte range in increasing offset order with no gaps or overlaps.

use alloc::vec::Vec;

use crate::error::Jp2Error;
use crate::limits::Limits;
use crate::sink::Diagnostics;

/// Default strip height in rows.
pub const DEFAULT_STRIP_HEIGHT: u32 = 256;

/// Default chunk target in pixels.
pub const DEFAULT_CHUNK_PIXELS: usize = 1 << 20;

/// Minimum chunk size in pixels; allocation failure below this is fatal.
pub const CHUNK_FLOOR_PIXELS: usize = 1024;

/// How the output stream is partitioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowMode {
    /// Decode and pack the whole image in one window.
    Whole,
    /// Decode in horizontal strips of the given height, packing each strip
    /// as soon as it is decoded.
    Strips { height: u32 },
    /// Decode the whole image, then pack through a chunk buffer of at most
    /// `target_pixels` pixels, shrinking on allocation failure.
    Chunked { target_pixels: usize },
}

impl Default for WindowMode {
    fn default() -> Self {
        WindowMode::Strips {
            height: DEFAULT_STRIP_HEIGHT,
        }
    }
}

/// Fixed-height strips covering `[y0, y1)`, last one sized by the remainder.
pub(crate) fn strips(y0: u32, y1: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    debug_assert!(height > 0);
    let mut y = y0;
    core::iter::from_fn(move || {
        if y >= y1 {
            return None;
        }
        let h = height.min(y1 - y);
        let strip = (y, h);
        y += h;
        Some(strip)
    })
}

/// Pixel-range windows `(offset, count)` tiling `[0, total_pixels)`.
pub(crate) fn chunks(total_pixels: usize, chunk_pixels: usize) -> impl Iterator<Item = (usize, usize)> {
    debug_assert!(chunk_pixels > 0);
    let mut offset = 0usize;
    core::iter::from_fn(move || {
        if offset >= total_pixels {
            return None;
        }
        let count = chunk_pixels.min(total_pixels - offset);
        let window = (offset, count);
        offset += count;
        Some(window)
    })
}

/// Allocate the chunk output buffer, halving the pixel target on allocation
/// failure down to [`CHUNK_FLOOR_PIXELS`].
///
/// Returns the buffer and the pixel count it holds. A successful allocation
/// below the requested size emits exactly one warning and continues; failure
/// at the floor is fatal.
pub(crate) fn allocate_chunk(
    target_pixels: usize,
    total_pixels: usize,
    channels: usize,
    limits: &Limits,
    diag: &mut dyn Diagnostics,
) -> Result<(Vec<u8>, usize), Jp2Error> {
    let requested = target_pixels.min(total_pixels).max(1);
    let mut pixels = requested;
    loop {
        let bytes = pixels
            .checked_mul(channels)
            .ok_or(Jp2Error::PlaneRangeMismatch)?;
        if limits.memory_allows(bytes) {
            let mut buf: Vec<u8> = Vec::new();
            if buf.try_reserve_exact(bytes).is_ok() {
                buf.resize(bytes, 0);
                if pixels < requested {
                    lwarn!("output buffer reduced to {} pixels", pixels);
                    diag.warning("output buffer size reduced");
                }
                return Ok((buf, pixels));
            }
        }
        if pixels <= CHUNK_FLOOR_PIXELS {
            return Err(Jp2Error::AllocationExhausted {
                requested_pixels: requested,
                floor: CHUNK_FLOOR_PIXELS,
            });
        }
        pixels = (pixels / 2).max(CHUNK_FLOOR_PIXELS);
    }
}
