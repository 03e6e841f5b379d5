//! Pipeline orchestration: one decode request from magic sniff to the last
//! window handed to the sink.

use alloc::vec::Vec;

use crate::color::{self, ColorHints, ColorPlan, ColorSpace};
use crate::engine::{DecodeEngine, DecodeParams, EngineDecoder};
use crate::error::Jp2Error;
use crate::format;
use crate::image::DecodedImage;
use crate::limits::Limits;
use crate::pack::pack_window;
use crate::pixel::PixelLayout;
use crate::sink::{Diagnostics, RasterSink, VecSink};
use crate::transform::ColorTransforms;
use crate::window::{self, WindowMode};

/// Summary of a completed decode.
#[derive(Clone, Copy, Debug)]
pub struct DecodeSummary {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

/// Decoded image output collected into one owned buffer.
#[derive(Clone, Debug)]
pub struct DecodeOutput {
    bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl DecodeOutput {
    /// Access the packed pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.bytes
    }

    /// Take ownership of the pixel data.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Reinterpret pixel data as a typed pixel slice.
    ///
    /// Returns [`Jp2Error::LayoutMismatch`] if the pixel layout doesn't match `P`.
    #[cfg(feature = "rgb")]
    pub fn as_pixels<P: crate::DecodePixel>(&self) -> Result<&[P], Jp2Error>
    where
        [u8]: rgb::AsPixels<P>,
    {
        use rgb::AsPixels as _;
        if self.layout != P::layout() {
            return Err(Jp2Error::LayoutMismatch {
                expected: P::layout(),
                actual: self.layout,
            });
        }
        Ok(self.pixels().as_pixels())
    }

    /// Zero-copy view as an [`imgref::ImgRef`] of typed pixels.
    ///
    /// Returns [`Jp2Error::LayoutMismatch`] if the pixel layout doesn't match `P`.
    #[cfg(feature = "imgref")]
    pub fn as_imgref<P: crate::DecodePixel>(&self) -> Result<imgref::ImgRef<'_, P>, Jp2Error>
    where
        [u8]: rgb::AsPixels<P>,
    {
        let pixels: &[P] = self.as_pixels()?;
        Ok(imgref::ImgRef::new(
            pixels,
            self.width as usize,
            self.height as usize,
        ))
    }
}

/// Builder for one decode invocation.
///
/// ```no_run
/// use zenjp2::{DecodeRequest, NullDiagnostics, VecSink, WindowMode};
/// # fn demo(engine: &impl zenjp2::DecodeEngine,
/// #         transforms: &impl zenjp2::ColorTransforms,
/// #         data: &[u8]) -> Result<(), zenjp2::Jp2Error> {
/// let mut sink = VecSink::new();
/// let mut diag = NullDiagnostics;
/// let summary = DecodeRequest::new(data)
///     .with_mode(WindowMode::Strips { height: 256 })
///     .decode(engine, transforms, &mut sink, &mut diag)?;
/// let rgba = sink.into_bytes();
/// # let _ = (summary, rgba); Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DecodeRequest<'a> {
    data: &'a [u8],
    hints: ColorHints,
    mode: WindowMode,
    limits: Option<&'a Limits>,
}

impl<'a> DecodeRequest<'a> {
    /// Decode request over a JP2 container or raw codestream buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            hints: ColorHints::default(),
            mode: WindowMode::default(),
            limits: None,
        }
    }

    /// Component count the consumer expects; 0 (the default) infers the
    /// color layout from the data.
    pub fn with_expected_components(mut self, count: u32) -> Self {
        self.hints.expected_components = count;
        self
    }

    /// Samples are indices into an external palette: skip rescaling and
    /// pass them through exactly.
    pub fn with_indexed_palette(mut self, indexed: bool) -> Self {
        self.hints.indexed_palette = indexed;
        self
    }

    /// The source carries an alpha plane among its components.
    pub fn with_alpha_in_data(mut self, alpha: bool) -> Self {
        self.hints.alpha_in_data = alpha;
        self
    }

    /// Windowing strategy; defaults to 256-row strips.
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    /// Bound untrusted dimensions and output allocations.
    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Run the pipeline, streaming packed windows into `sink`.
    ///
    /// Exactly one terminal outcome: `Ok` after the sink has received the
    /// full image, or an error with no partially packed window delivered.
    pub fn decode<E: DecodeEngine, T: ColorTransforms>(
        self,
        engine: &E,
        transforms: &T,
        sink: &mut dyn RasterSink,
        diag: &mut dyn Diagnostics,
    ) -> Result<DecodeSummary, Jp2Error> {
        let kind = format::detect(self.data)?;
        ldebug!("detected {:?} codestream, {} bytes", kind, self.data.len());

        let params = DecodeParams {
            ignore_palette_boxes: self.hints.indexed_palette,
        };
        let mut decoder = engine.open(kind, self.data, &params)?;
        let mut image = decoder.read_header()?;

        let width = image.width();
        let height = image.height();
        let default_limits = Limits::default();
        let limits = self.limits.unwrap_or(&default_limits);
        limits.check(width, height)?;

        let plan = color::classify(&image, &self.hints)?;
        if plan.consumed < image.numcomps() && !plan.needs_space_transform() {
            decoder.restrict_components(plan.consumed)?;
        }

        let total_pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or(Jp2Error::DimensionsTooLarge { width, height })?;
        let total_bytes = total_pixels
            .checked_mul(plan.channels)
            .ok_or(Jp2Error::DimensionsTooLarge { width, height })?;
        sink.reserve(total_bytes)?;

        match self.mode {
            WindowMode::Strips { height: strip_h } => {
                decode_strips(
                    &mut decoder,
                    &mut image,
                    &plan,
                    &self.hints,
                    transforms,
                    sink,
                    strip_h.max(1),
                )?;
            }
            WindowMode::Whole | WindowMode::Chunked { .. } => {
                let target = match self.mode {
                    WindowMode::Chunked { target_pixels } => target_pixels,
                    _ => total_pixels,
                };
                decode_chunked(
                    &mut decoder,
                    &mut image,
                    &plan,
                    &self.hints,
                    transforms,
                    sink,
                    diag,
                    limits,
                    target,
                    total_pixels,
                )?;
            }
        }

        // Engine teardown does not free this buffer in the original C API;
        // take and drop it here so nothing leaks or double-frees.
        image.release_icc_profile();
        decoder.finish()?;

        Ok(DecodeSummary {
            width,
            height,
            layout: plan.layout(),
        })
    }

    /// Decode into a single owned buffer.
    pub fn decode_to_vec<E: DecodeEngine, T: ColorTransforms>(
        self,
        engine: &E,
        transforms: &T,
        diag: &mut dyn Diagnostics,
    ) -> Result<DecodeOutput, Jp2Error> {
        let mut sink = VecSink::new();
        let summary = self.decode(engine, transforms, &mut sink, diag)?;
        Ok(DecodeOutput {
            bytes: sink.into_bytes(),
            width: summary.width,
            height: summary.height,
            layout: summary.layout,
        })
    }
}

/// Strip-wise path: bound the engine's working set by decoding fixed-height
/// strips, converting and emitting each one before the next decode.
fn decode_strips<D: EngineDecoder, T: ColorTransforms>(
    decoder: &mut D,
    image: &mut DecodedImage,
    plan: &ColorPlan,
    hints: &ColorHints,
    transforms: &T,
    sink: &mut dyn RasterSink,
    strip_height: u32,
) -> Result<(), Jp2Error> {
    let width = image.width() as usize;
    let (x0, x1, y0, y1) = (image.x0, image.x1, image.y0, image.y1);
    let mut out = Vec::new();

    for (y, h) in window::strips(y0, y1, strip_height) {
        decoder.decode_region(image, x0, y, x1, y + h)?;
        convert_planes(image, plan, hints, transforms)?;

        let strip_pixels = width * h as usize;
        let strip_bytes = strip_pixels
            .checked_mul(plan.channels)
            .ok_or(Jp2Error::PlaneRangeMismatch)?;
        out.clear();
        out.resize(strip_bytes, 0);

        let planes: Vec<&[i32]> = image.comps[..plan.consumed.min(image.comps.len())]
            .iter()
            .map(|c| c.data.as_slice())
            .collect();
        pack_window(&planes, plan, 0..strip_pixels, &mut out)?;

        let offset = (y - y0) as usize * width * plan.channels;
        sink.write(&out, offset);
    }
    Ok(())
}

/// Chunked path: decode the full region once, then pack it through a
/// bounded, possibly shrunk output buffer.
#[allow(clippy::too_many_arguments)]
fn decode_chunked<D: EngineDecoder, T: ColorTransforms>(
    decoder: &mut D,
    image: &mut DecodedImage,
    plan: &ColorPlan,
    hints: &ColorHints,
    transforms: &T,
    sink: &mut dyn RasterSink,
    diag: &mut dyn Diagnostics,
    limits: &Limits,
    target_pixels: usize,
    total_pixels: usize,
) -> Result<(), Jp2Error> {
    let (x0, x1, y0, y1) = (image.x0, image.x1, image.y0, image.y1);
    decoder.decode_region(image, x0, y0, x1, y1)?;
    convert_planes(image, plan, hints, transforms)?;

    if total_pixels == 0 {
        return Ok(());
    }
    let (mut buf, chunk_pixels) =
        window::allocate_chunk(target_pixels, total_pixels, plan.channels, limits, diag)?;
    ldebug!("packing {} pixels in {}-pixel chunks", total_pixels, chunk_pixels);

    let planes: Vec<&[i32]> = image.comps[..plan.consumed.min(image.comps.len())]
        .iter()
        .map(|c| c.data.as_slice())
        .collect();
    for (offset, count) in window::chunks(total_pixels, chunk_pixels) {
        let bytes = count * plan.channels;
        pack_window(&planes, plan, offset..offset + count, &mut buf[..bytes])?;
        sink.write(&buf[..bytes], offset * plan.channels);
    }
    Ok(())
}

/// Apply the plan's space transform, then rescale every consumed plane to
/// 8 bits — unless the samples are palette indices, which must stay exact.
fn convert_planes<T: ColorTransforms>(
    image: &mut DecodedImage,
    plan: &ColorPlan,
    hints: &ColorHints,
    transforms: &T,
) -> Result<(), Jp2Error> {
    if plan.needs_space_transform() {
        match plan.space {
            ColorSpace::Sycc => transforms.sycc_to_rgb(image)?,
            ColorSpace::Eycc => transforms.esycc_to_rgb(image)?,
            ColorSpace::Cmyk => transforms.cmyk_to_rgb(image)?,
            _ => {}
        }
    }
    if !hints.indexed_palette {
        let n = plan.consumed.min(image.comps.len());
        for plane in &mut image.comps[..n] {
            transforms.rescale_to_8bit(plane);
        }
    }
    Ok(())
}
