//! End-to-end pipeline tests against fake engine/transform collaborators.

use std::cell::Cell;

use zenjp2::{
    ColorSpace, ColorTransforms, ComponentPlane, DecodeEngine, DecodeParams, DecodeRequest,
    DecodedImage, Diagnostics, EngineDecoder, EngineStage, Jp2Error, Limits, PixelLayout,
    RasterSink, WindowMode, exit_code,
};

/// Raw codestream magic (SOC + SIZ marker prefix).
const J2K_MAGIC: [u8; 4] = [0xFF, 0x4F, 0xFF, 0x51];

fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

// ── Fake engine ─────────────────────────────────────────────────────

struct CompSpec {
    dx: u32,
    dy: u32,
    prec: u8,
    signed: bool,
    /// Full-image samples on this component's subsampled grid.
    data: Vec<i32>,
}

struct FakeEngine {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    comps: Vec<CompSpec>,
    icc_profile: Option<Vec<u8>>,
    fail_at: Option<EngineStage>,
    restricted_to: Cell<Option<usize>>,
    decode_calls: Cell<usize>,
}

impl FakeEngine {
    fn new(width: u32, height: u32, comps: Vec<CompSpec>) -> Self {
        Self {
            width,
            height,
            color_space: ColorSpace::Unknown,
            comps,
            icc_profile: None,
            fail_at: None,
            restricted_to: Cell::new(None),
            decode_calls: Cell::new(0),
        }
    }

    /// Single full-resolution component with a deterministic ramp.
    fn gray(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![ramp_comp(width, height, 0)])
    }

    fn rgb(width: u32, height: u32) -> Self {
        Self::new(
            width,
            height,
            (0..3).map(|c| ramp_comp(width, height, c)).collect(),
        )
    }
}

fn ramp_comp(width: u32, height: u32, seed: i32) -> CompSpec {
    let data = (0..(width * height) as i32)
        .map(|i| (i * 7 + seed * 31) & 0xFF)
        .collect();
    CompSpec {
        dx: 1,
        dy: 1,
        prec: 8,
        signed: false,
        data,
    }
}

struct FakeDecoder<'a> {
    engine: &'a FakeEngine,
}

impl DecodeEngine for FakeEngine {
    type Decoder<'a> = FakeDecoder<'a>;

    fn open<'a>(
        &'a self,
        _kind: zenjp2::CodecKind,
        _data: &'a [u8],
        _params: &DecodeParams,
    ) -> Result<Self::Decoder<'a>, Jp2Error> {
        if self.fail_at == Some(EngineStage::Setup) {
            return Err(Jp2Error::engine(EngineStage::Setup, "forced setup failure"));
        }
        Ok(FakeDecoder { engine: self })
    }
}

impl EngineDecoder for FakeDecoder<'_> {
    fn read_header(&mut self) -> Result<DecodedImage, Jp2Error> {
        if self.engine.fail_at == Some(EngineStage::Header) {
            return Err(Jp2Error::engine(EngineStage::Header, "forced header failure"));
        }
        let comps = self
            .engine
            .comps
            .iter()
            .map(|spec| ComponentPlane {
                data: Vec::new(),
                width: ceil_div(self.engine.width, spec.dx),
                height: ceil_div(self.engine.height, spec.dy),
                dx: spec.dx,
                dy: spec.dy,
                prec: spec.prec,
                signed: spec.signed,
            })
            .collect();
        Ok(DecodedImage {
            x0: 0,
            y0: 0,
            x1: self.engine.width,
            y1: self.engine.height,
            color_space: self.engine.color_space,
            comps,
            icc_profile: self.engine.icc_profile.clone(),
        })
    }

    fn restrict_components(&mut self, keep: usize) -> Result<(), Jp2Error> {
        self.engine.restricted_to.set(Some(keep));
        Ok(())
    }

    fn decode_region(
        &mut self,
        image: &mut DecodedImage,
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
    ) -> Result<(), Jp2Error> {
        if self.engine.fail_at == Some(EngineStage::Decode) {
            return Err(Jp2Error::engine(EngineStage::Decode, "forced decode failure"));
        }
        self.engine.decode_calls.set(self.engine.decode_calls.get() + 1);

        image.comps.clear();
        for spec in &self.engine.comps {
            let full_w = ceil_div(self.engine.width, spec.dx);
            let (px0, px1) = (ceil_div(x0, spec.dx), ceil_div(x1, spec.dx));
            let (py0, py1) = (ceil_div(y0, spec.dy), ceil_div(y1, spec.dy));
            let (w, h) = (px1 - px0, py1 - py0);
            let mut data = Vec::with_capacity((w * h) as usize);
            for row in py0..py1 {
                let start = (row * full_w + px0) as usize;
                data.extend_from_slice(&spec.data[start..start + w as usize]);
            }
            image.comps.push(ComponentPlane {
                data,
                width: w,
                height: h,
                dx: spec.dx,
                dy: spec.dy,
                prec: spec.prec,
                signed: spec.signed,
            });
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Jp2Error> {
        if self.engine.fail_at == Some(EngineStage::Finish) {
            return Err(Jp2Error::engine(EngineStage::Finish, "forced finish failure"));
        }
        Ok(())
    }
}

// ── Fake transforms ─────────────────────────────────────────────────

#[derive(Default)]
struct RefTransforms {
    rescale_calls: Cell<usize>,
    sycc_calls: Cell<usize>,
    cmyk_calls: Cell<usize>,
    esycc_calls: Cell<usize>,
}

impl ColorTransforms for RefTransforms {
    fn rescale_to_8bit(&self, plane: &mut ComponentPlane) {
        self.rescale_calls.set(self.rescale_calls.get() + 1);
        if plane.prec == 8 && !plane.signed {
            return;
        }
        let level = if plane.signed { 1 << (plane.prec - 1) } else { 0 };
        for v in &mut plane.data {
            let shifted = *v + level;
            *v = if plane.prec > 8 {
                shifted >> (plane.prec - 8)
            } else {
                shifted << (8 - plane.prec)
            };
        }
        plane.prec = 8;
        plane.signed = false;
    }

    fn sycc_to_rgb(&self, image: &mut DecodedImage) -> Result<(), Jp2Error> {
        self.sycc_calls.set(self.sycc_calls.get() + 1);
        let (w, h) = (image.comps[0].width, image.comps[0].height);
        let luma = image.comps[0].data.clone();
        let upsample = |c: &ComponentPlane| -> Vec<i32> {
            let mut out = Vec::with_capacity((w * h) as usize);
            for y in 0..h {
                for x in 0..w {
                    out.push(c.data[((y / c.dy) * c.width + x / c.dx) as usize]);
                }
            }
            out
        };
        let cb = upsample(&image.comps[1]);
        let cr = upsample(&image.comps[2]);
        let prec = image.comps[0].prec;
        let mk = |data: Vec<i32>| ComponentPlane {
            data,
            width: w,
            height: h,
            dx: 1,
            dy: 1,
            prec,
            signed: false,
        };
        // Not a real YCC matrix; a stand-in that keeps the test deterministic.
        image.comps = vec![mk(luma), mk(cb), mk(cr)];
        Ok(())
    }

    fn cmyk_to_rgb(&self, image: &mut DecodedImage) -> Result<(), Jp2Error> {
        self.cmyk_calls.set(self.cmyk_calls.get() + 1);
        image.comps.truncate(3);
        Ok(())
    }

    fn esycc_to_rgb(&self, image: &mut DecodedImage) -> Result<(), Jp2Error> {
        self.esycc_calls.set(self.esycc_calls.get() + 1);
        image.comps.truncate(3);
        Ok(())
    }
}

// ── Fake sink and diagnostics ───────────────────────────────────────

#[derive(Default)]
struct CollectSink {
    reserved: Option<usize>,
    writes: Vec<(usize, usize)>, // (byte_offset, byte_len)
    buf: Vec<u8>,
}

impl RasterSink for CollectSink {
    fn reserve(&mut self, total_bytes: usize) -> Result<(), Jp2Error> {
        assert!(self.reserved.is_none(), "reserve called twice");
        self.reserved = Some(total_bytes);
        self.buf = vec![0; total_bytes];
        Ok(())
    }

    fn write(&mut self, bytes: &[u8], byte_offset: usize) {
        self.writes.push((byte_offset, bytes.len()));
        self.buf[byte_offset..byte_offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl CollectSink {
    /// Writes tile the reserved range in order, no gaps, no overlaps.
    fn assert_tiled(&self) {
        let total = self.reserved.expect("reserve never called");
        let mut next = 0;
        for &(offset, len) in &self.writes {
            assert_eq!(offset, next, "window out of order or gapped");
            next = offset + len;
        }
        assert_eq!(next, total, "windows do not cover the reserved range");
    }
}

#[derive(Default)]
struct CollectDiag {
    warnings: Vec<String>,
}

impl Diagnostics for CollectDiag {
    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

// ── Tests ───────────────────────────────────────────────────────────

fn decode_with(
    engine: &FakeEngine,
    request: DecodeRequest<'_>,
) -> (Result<zenjp2::DecodeSummary, Jp2Error>, CollectSink, CollectDiag, RefTransforms) {
    let transforms = RefTransforms::default();
    let mut sink = CollectSink::default();
    let mut diag = CollectDiag::default();
    let result = request.decode(engine, &transforms, &mut sink, &mut diag);
    (result, sink, diag, transforms)
}

#[test]
fn unknown_magic_is_fatal_with_no_output() {
    let engine = FakeEngine::gray(8, 8);
    let (result, sink, diag, _) = decode_with(&engine, DecodeRequest::new(b"not a jp2"));
    assert!(matches!(result, Err(Jp2Error::UnknownFormat)));
    assert!(sink.reserved.is_none());
    assert!(sink.writes.is_empty());
    assert!(diag.warnings.is_empty());
    assert_eq!(exit_code(&result), 1);
}

#[test]
fn gray_image_infers_rgba_output() {
    let engine = FakeEngine::gray(5, 4);
    let (result, sink, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Whole),
    );
    let summary = result.unwrap();
    assert_eq!(summary.layout, PixelLayout::Rgba8);
    sink.assert_tiled();
    assert_eq!(sink.buf.len(), 5 * 4 * 4);
    // Gray replicated across RGB with opaque alpha.
    let g0 = engine.comps[0].data[0] as u8;
    assert_eq!(&sink.buf[0..4], &[g0, g0, g0, 255]);
    assert_eq!(exit_code(&Ok::<_, Jp2Error>(())), 0);
}

#[test]
fn two_components_without_alpha_hint_emit_one_channel() {
    let engine = FakeEngine::new(6, 4, vec![ramp_comp(6, 4, 0), ramp_comp(6, 4, 1)]);
    let (result, sink, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Whole),
    );
    let summary = result.unwrap();
    assert_eq!(summary.layout, PixelLayout::Gray8);
    sink.assert_tiled();
    // 1-channel gray, never 2-channel: output is exactly comp0.
    let expected: Vec<u8> = engine.comps[0].data.iter().map(|&v| v as u8).collect();
    assert_eq!(sink.buf, expected);
}

#[test]
fn two_components_with_alpha_hint_emit_rgba() {
    let engine = FakeEngine::new(3, 2, vec![ramp_comp(3, 2, 0), ramp_comp(3, 2, 9)]);
    let (result, sink, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC)
            .with_alpha_in_data(true)
            .with_mode(WindowMode::Whole),
    );
    assert_eq!(result.unwrap().layout, PixelLayout::Rgba8);
    let g0 = engine.comps[0].data[0] as u8;
    let a0 = engine.comps[1].data[0] as u8;
    assert_eq!(&sink.buf[0..4], &[g0, g0, g0, a0]);
}

#[test]
fn sycc_autodetected_from_subsampling_and_transformed() {
    let w = 8;
    let h = 8;
    let luma = ramp_comp(w, h, 0);
    let chroma = |seed| {
        let mut c = ramp_comp(w / 2, h / 2, seed);
        c.dx = 2;
        c.dy = 2;
        c
    };
    let engine = FakeEngine::new(w, h, vec![luma, chroma(1), chroma(2)]);
    let (result, sink, _, transforms) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Whole),
    );
    assert_eq!(result.unwrap().layout, PixelLayout::Rgba8);
    assert_eq!(transforms.sycc_calls.get(), 1);
    sink.assert_tiled();
    assert_eq!(sink.buf.len(), (w * h * 4) as usize);
    // Every pixel carries the synthesized opaque alpha.
    assert!(sink.buf.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn indexed_mode_never_rescales() {
    let mut comp = ramp_comp(4, 4, 0);
    comp.prec = 16; // would shift every sample if rescale ran
    let raw: Vec<u8> = comp.data.iter().map(|&v| v as u8).collect();
    let engine = FakeEngine::new(4, 4, vec![comp]);
    let (result, sink, _, transforms) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC)
            .with_expected_components(1)
            .with_indexed_palette(true)
            .with_mode(WindowMode::Whole),
    );
    assert_eq!(result.unwrap().layout, PixelLayout::Indexed8);
    assert_eq!(transforms.rescale_calls.get(), 0);
    // Byte-for-byte the raw decoded samples, modulo type width.
    assert_eq!(sink.buf, raw);
}

#[test]
fn truncation_restricts_engine_components() {
    let engine = FakeEngine::new(
        4,
        4,
        (0..4).map(|c| ramp_comp(4, 4, c)).collect(),
    );
    let (result, _, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC)
            .with_expected_components(3)
            .with_mode(WindowMode::Whole),
    );
    assert_eq!(result.unwrap().layout, PixelLayout::Rgb8);
    assert_eq!(engine.restricted_to.get(), Some(3));
}

#[test]
fn strip_mode_produces_three_strips_matching_single_shot() {
    let w = 16;
    let h = 600;
    let engine = FakeEngine::gray(w, h);

    let (result, strip_sink, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Strips { height: 256 }),
    );
    result.unwrap();
    strip_sink.assert_tiled();
    let row_bytes = (w * 4) as usize;
    assert_eq!(
        strip_sink.writes,
        vec![
            (0, 256 * row_bytes),
            (256 * row_bytes, 256 * row_bytes),
            (512 * row_bytes, 88 * row_bytes),
        ]
    );
    assert_eq!(engine.decode_calls.get(), 3);

    let (result, whole_sink, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Whole),
    );
    result.unwrap();
    assert_eq!(strip_sink.buf, whole_sink.buf);
}

#[test]
fn chunk_shrink_warns_once_and_matches_reference() {
    let w = 64;
    let h = 64; // 4096 pixels total
    let engine = FakeEngine::rgb(w, h);
    let limits = Limits {
        // 2048-pixel RGBA chunks fit; the 4096-pixel request does not.
        max_memory_bytes: Some(2048 * 4),
        ..Default::default()
    };
    let (result, chunk_sink, diag, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC)
            .with_mode(WindowMode::Chunked { target_pixels: 4096 })
            .with_limits(&limits),
    );
    result.unwrap();
    assert_eq!(diag.warnings.len(), 1);
    chunk_sink.assert_tiled();
    assert_eq!(chunk_sink.writes.len(), 2);

    let (result, whole_sink, whole_diag, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Whole),
    );
    result.unwrap();
    assert!(whole_diag.warnings.is_empty());
    assert_eq!(chunk_sink.buf, whole_sink.buf);
}

#[test]
fn allocation_exhaustion_below_floor_is_fatal() {
    let engine = FakeEngine::rgb(64, 64);
    let limits = Limits {
        max_memory_bytes: Some(64), // below the 1024-pixel floor
        ..Default::default()
    };
    let (result, sink, diag, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC)
            .with_mode(WindowMode::Chunked { target_pixels: 4096 })
            .with_limits(&limits),
    );
    assert!(matches!(result, Err(Jp2Error::AllocationExhausted { .. })));
    assert!(sink.writes.is_empty());
    assert!(diag.warnings.is_empty());
}

#[test]
fn mid_decode_failure_aborts_without_partial_window() {
    let mut engine = FakeEngine::gray(8, 600);
    engine.fail_at = Some(EngineStage::Decode);
    let (result, sink, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Strips { height: 256 }),
    );
    assert!(matches!(
        result,
        Err(Jp2Error::Engine {
            stage: EngineStage::Decode,
            ..
        })
    ));
    // The failing window never reaches the sink.
    assert!(sink.writes.is_empty());
}

#[test]
fn finish_failure_is_fatal_even_after_full_delivery() {
    let mut engine = FakeEngine::gray(4, 4);
    engine.fail_at = Some(EngineStage::Finish);
    let (result, sink, _, _) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Whole),
    );
    assert!(matches!(
        result,
        Err(Jp2Error::Engine {
            stage: EngineStage::Finish,
            ..
        })
    ));
    sink.assert_tiled(); // bytes were delivered, but the decode still failed
    assert_eq!(exit_code(&result), 1);
}

#[test]
fn four_components_with_alpha_hint_pass_through() {
    let engine = FakeEngine::new(3, 3, (0..4).map(|c| ramp_comp(3, 3, c)).collect());
    let (result, sink, _, transforms) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC)
            .with_alpha_in_data(true)
            .with_mode(WindowMode::Whole),
    );
    assert_eq!(result.unwrap().layout, PixelLayout::Rgba8);
    assert_eq!(transforms.sycc_calls.get(), 0);
    let px: Vec<u8> = (0..4).map(|c| engine.comps[c].data[0] as u8).collect();
    assert_eq!(&sink.buf[0..4], &px[..]);
}

#[test]
fn high_precision_samples_are_rescaled_before_packing() {
    let mut comp = ramp_comp(4, 2, 0);
    comp.prec = 12;
    comp.data.iter_mut().for_each(|v| *v <<= 4); // 12-bit ramp
    let expected0 = (comp.data[0] >> 4) as u8;
    let engine = FakeEngine::new(4, 2, vec![comp]);
    let (result, sink, _, transforms) = decode_with(
        &engine,
        DecodeRequest::new(&J2K_MAGIC).with_mode(WindowMode::Whole),
    );
    result.unwrap();
    assert_eq!(transforms.rescale_calls.get(), 1);
    assert_eq!(sink.buf[0], expected0);
}

#[test]
fn decode_to_vec_collects_whole_image() {
    let engine = FakeEngine::gray(4, 3);
    let transforms = RefTransforms::default();
    let mut diag = CollectDiag::default();
    let out = DecodeRequest::new(&J2K_MAGIC)
        .with_mode(WindowMode::Strips { height: 2 })
        .decode_to_vec(&engine, &transforms, &mut diag)
        .unwrap();
    assert_eq!(out.width, 4);
    assert_eq!(out.height, 3);
    assert_eq!(out.layout, PixelLayout::Rgba8);
    assert_eq!(out.pixels().len(), 4 * 3 * 4);
}
