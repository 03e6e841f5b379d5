//! # zenjp2
//!
//! JPEG 2000 post-decode raster pipeline: turns the component planes a
//! wavelet/entropy decode engine produces into a single interleaved,
//! 8-bit-per-channel pixel buffer, streamed to a sink under a bounded
//! memory ceiling.
//!
//! The engine itself, the color-transform kernels, and the bit-depth
//! rescale primitive are collaborators injected through traits
//! ([`DecodeEngine`], [`ColorTransforms`]); this crate owns the parts the
//! container format leaves ambiguous:
//!
//! - **Color classification** — inferring SYCC from chroma subsampling,
//!   gray/gray+alpha from component counts, and honoring consumer hints
//!   for indexed palettes and pre-shaped RGBA data.
//! - **Packing** — interleaving 1, 3, or 4 planes (synthesizing opaque
//!   alpha where needed) into canonical channel order.
//! - **Streaming** — fixed-height decode strips or bounded output chunks
//!   with shrink-on-allocation-failure, so peak memory is independent of
//!   image size even with attacker-influenced dimensions.
//!
//! ## Usage
//!
//! ```no_run
//! use zenjp2::{DecodeRequest, NullDiagnostics, VecSink, WindowMode};
//! # fn demo(engine: &impl zenjp2::DecodeEngine,
//! #         transforms: &impl zenjp2::ColorTransforms,
//! #         data: &[u8]) -> Result<(), zenjp2::Jp2Error> {
//! let mut sink = VecSink::new();
//! let mut diag = NullDiagnostics;
//!
//! let summary = DecodeRequest::new(data)
//!     .with_mode(WindowMode::Chunked { target_pixels: 1 << 20 })
//!     .decode(engine, transforms, &mut sink, &mut diag)?;
//!
//! println!("{}x{} {:?}", summary.width, summary.height, summary.layout);
//! # Ok(())
//! # }
//! ```
//!
//! ## Non-Goals
//!
//! - Compression, wavelet or entropy coding — bring an engine
//! - Container/box parsing beyond the fixed-position magic check
//! - The color-transform and rescale math itself (external kernels)

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[macro_use]
mod log;

mod color;
mod decode;
mod engine;
mod error;
mod format;
mod image;
mod limits;
mod pack;
mod pixel;
mod sink;
mod transform;
mod window;

// Re-exports
pub use color::{ColorHints, ColorPlan, ColorSpace, classify};
pub use decode::{DecodeOutput, DecodeRequest, DecodeSummary};
pub use engine::{DecodeEngine, DecodeParams, EngineDecoder, EngineStage};
pub use error::{Jp2Error, exit_code};
pub use format::{CodecKind, detect};
pub use image::{ComponentPlane, DecodedImage};
pub use limits::Limits;
pub use pack::pack_window;
pub use pixel::PixelLayout;
pub use sink::{Diagnostics, NullDiagnostics, RasterSink, VecSink};
pub use transform::ColorTransforms;
pub use window::{CHUNK_FLOOR_PIXELS, DEFAULT_CHUNK_PIXELS, DEFAULT_STRIP_HEIGHT, WindowMode};

/// Typed pixels a [`DecodeOutput`] can be viewed as.
#[cfg(feature = "rgb")]
pub trait DecodePixel {
    fn layout() -> PixelLayout;
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGBA8 {
    fn layout() -> PixelLayout {
        PixelLayout::Rgba8
    }
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::RGB8 {
    fn layout() -> PixelLayout {
        PixelLayout::Rgb8
    }
}

#[cfg(feature = "rgb")]
impl DecodePixel for rgb::alt::GRAY8 {
    fn layout() -> PixelLayout {
        PixelLayout::Gray8
    }
}
