//! Decode-engine collaborator interface.
//!
//! The wavelet/entropy engine that turns compressed bytes into component
//! planes lives behind these traits. The pipeline drives the same call
//! sequence the OpenJPEG C API uses — open, read header, (optionally)
//! restrict components, decode one or more regions, finish — with teardown
//! handled by `Drop` on every exit path.

use crate::error::Jp2Error;
use crate::format::CodecKind;
use crate::image::DecodedImage;

/// Pipeline stage at which an engine call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStage {
    /// Decoder construction or parameter setup.
    Setup,
    /// Reading the main header (and JP2 boxes).
    Header,
    /// Restricting the decode area to a window.
    SetArea,
    /// Decoding sample planes for a region.
    Decode,
    /// Finalizing the codestream read.
    Finish,
}

impl core::fmt::Display for EngineStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            EngineStage::Setup => "setup",
            EngineStage::Header => "header read",
            EngineStage::SetArea => "decode-area setup",
            EngineStage::Decode => "region decode",
            EngineStage::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// Engine configuration derived from the caller's hints.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecodeParams {
    /// Skip applying palette/channel-definition boxes so palette indices
    /// come through raw (set when the consumer holds the colormap).
    pub ignore_palette_boxes: bool,
}

/// Factory for decoders over one input buffer.
pub trait DecodeEngine {
    type Decoder<'a>: EngineDecoder
    where
        Self: 'a;

    /// Construct and configure a decoder of the given kind over `data`.
    ///
    /// Failures here surface as [`EngineStage::Setup`] errors.
    fn open<'a>(
        &'a self,
        kind: CodecKind,
        data: &'a [u8],
        params: &DecodeParams,
    ) -> Result<Self::Decoder<'a>, Jp2Error>;
}

/// One in-flight decode over a single codestream.
pub trait EngineDecoder {
    /// Read the main header, returning image bounds, component metadata and
    /// the declared color space. Planes may be empty until a region decode.
    fn read_header(&mut self) -> Result<DecodedImage, Jp2Error>;

    /// Ask the engine to decode only the first `keep` components.
    ///
    /// Optional capability; engines that decode everything regardless can
    /// keep the default no-op, the pipeline only consumes the planes the
    /// color plan names.
    fn restrict_components(&mut self, keep: usize) -> Result<(), Jp2Error> {
        let _ = keep;
        Ok(())
    }

    /// Decode samples for the pixel region `[x0, x1) x [y0, y1)` into the
    /// image's planes. Plane dimensions reflect the region, not the full
    /// image.
    fn decode_region(
        &mut self,
        image: &mut DecodedImage,
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
    ) -> Result<(), Jp2Error>;

    /// Finalize the codestream read. Failures are fatal even though the
    /// sink may already have received every window.
    fn finish(&mut self) -> Result<(), Jp2Error>;
}
