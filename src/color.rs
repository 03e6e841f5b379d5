//! Color-space classification.
//!
//! JP2 containers routinely under-specify color semantics: an untagged
//! three-component image with subsampled chroma planes is almost always
//! YCbCr, and one- or two-component images are grayscale with or without an
//! alpha plane. [`classify`] resolves that ambiguity once, on the full-image
//! header, and fixes the output channel layout for every window that
//! follows.

use crate::error::Jp2Error;
use crate::image::DecodedImage;
use crate::pixel::PixelLayout;

/// Effective color space of the decoded planes.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Not declared by the container and not inferred.
    #[default]
    Unknown,
    /// Single luminance channel.
    Gray,
    /// Luminance plus a real alpha plane.
    GrayAlpha,
    /// Three RGB-like channels.
    Rgb,
    /// Four channels where the fourth is taken as alpha.
    RgbAlpha,
    /// YCbCr (JP2 "sYCC"), needs a transform to RGB.
    Sycc,
    /// Extended YCC, needs a transform to RGB.
    Eycc,
    /// CMYK, needs a transform to RGB.
    Cmyk,
    /// Palette indices passed through untouched for an external colormap.
    Indexed,
}

/// Caller-supplied hints about what the consumer expects from the stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColorHints {
    /// Component count the consumer expects; 0 means "infer from the data".
    pub expected_components: u32,
    /// The samples are indices into an external palette and must stay exact.
    pub indexed_palette: bool,
    /// The source data carries an alpha plane.
    pub alpha_in_data: bool,
}

/// Result of classification: the conversion path and output layout for the
/// whole decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorPlan {
    /// Effective color space after inference.
    pub space: ColorSpace,
    /// Whether output is forced to 4-channel RGBA (with synthesized or real
    /// alpha) after an optional space transform.
    pub convert_to_rgba: bool,
    /// How many leading component planes are consumed.
    pub consumed: usize,
    /// Output channels per pixel; always 1, 3, or 4.
    pub channels: usize,
}

impl ColorPlan {
    /// Packed output layout for this plan.
    pub fn layout(&self) -> PixelLayout {
        match (self.channels, self.space) {
            (1, ColorSpace::Indexed) => PixelLayout::Indexed8,
            (1, _) => PixelLayout::Gray8,
            (3, _) => PixelLayout::Rgb8,
            _ => PixelLayout::Rgba8,
        }
    }

    /// Whether this plan routes through a YCC/CMYK-to-RGB transform.
    pub fn needs_space_transform(&self) -> bool {
        self.convert_to_rgba
            && matches!(self.space, ColorSpace::Sycc | ColorSpace::Eycc | ColorSpace::Cmyk)
    }
}

/// Decide the effective color space and output layout from the header.
///
/// Pure and idempotent: classifying the same header twice yields the same
/// plan. Runs exactly once per decode, before any window is processed.
pub fn classify(image: &DecodedImage, hints: &ColorHints) -> Result<ColorPlan, Jp2Error> {
    let numcomps = image.numcomps();

    let plan = if hints.expected_components == 0 {
        infer_plan(image, hints, numcomps)
    } else {
        // The consumer asserts it knows the semantics: consume at most the
        // declared count, no transform, indices pass through for palettes.
        let consumed = numcomps.min(hints.expected_components as usize);
        let space = if hints.indexed_palette {
            ColorSpace::Indexed
        } else {
            image.color_space
        };
        ColorPlan {
            space,
            convert_to_rgba: false,
            consumed,
            channels: consumed,
        }
    };

    if !matches!(plan.channels, 1 | 3 | 4) {
        return Err(Jp2Error::UnsupportedComponentCount {
            channels: plan.channels,
        });
    }
    if plan.consumed > numcomps {
        return Err(Jp2Error::PlaneRangeMismatch);
    }

    ldebug!(
        "classified {:?}: convert_to_rgba={} consumed={} channels={}",
        plan.space,
        plan.convert_to_rgba,
        plan.consumed,
        plan.channels
    );
    Ok(plan)
}

fn infer_plan(image: &DecodedImage, hints: &ColorHints, numcomps: usize) -> ColorPlan {
    // Four planes with the alpha hint are already RGBA-shaped. The fourth
    // plane is taken as alpha on faith, without re-checking that the
    // declared space needs no transform.
    if hints.alpha_in_data && numcomps == 4 {
        return ColorPlan {
            space: ColorSpace::RgbAlpha,
            convert_to_rgba: false,
            consumed: 4,
            channels: 4,
        };
    }

    // Identical 1:1 subsampling on the first plane while chroma subsamples
    // is the signature of an untagged YCbCr 4:2:0/4:2:2 encode.
    if image.color_space != ColorSpace::Sycc
        && numcomps == 3
        && image.comps[0].dx == image.comps[0].dy
        && image.comps[1].dx != 1
    {
        return ColorPlan {
            space: ColorSpace::Sycc,
            convert_to_rgba: true,
            consumed: 3,
            channels: 4,
        };
    }

    match numcomps {
        1 => ColorPlan {
            space: ColorSpace::Gray,
            convert_to_rgba: true,
            consumed: 1,
            channels: 4,
        },
        2 if hints.alpha_in_data => ColorPlan {
            space: ColorSpace::GrayAlpha,
            convert_to_rgba: true,
            consumed: 2,
            channels: 4,
        },
        // Two planes without the alpha hint: the second plane is dropped and
        // the output stays plain gray. A 2-channel buffer is never emitted.
        2 => ColorPlan {
            space: ColorSpace::Gray,
            convert_to_rgba: false,
            consumed: 1,
            channels: 1,
        },
        // Declared space stands; YCC/CMYK variants get transformed, anything
        // else is treated as RGB-like. Only the first three planes feed the
        // output even for a four-plane image without the alpha hint.
        _ => ColorPlan {
            space: image.color_space,
            convert_to_rgba: true,
            consumed: 3,
            channels: 4,
        },
    }
}
