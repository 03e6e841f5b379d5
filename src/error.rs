use alloc::string::String;

use crate::engine::EngineStage;

/// Errors from the post-decode pixel pipeline.
///
/// Every variant is fatal: the decode aborts and no further bytes reach the
/// sink. Non-fatal conditions (e.g. a reduced chunk buffer) go through the
/// [`Diagnostics`](crate::Diagnostics) warning channel instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Jp2Error {
    #[error("unknown format: no JP2 or J2K magic at start of input")]
    UnknownFormat,

    #[error("decode engine failed during {stage}: {message}")]
    Engine {
        stage: EngineStage,
        message: String,
    },

    #[error(
        "output buffer allocation failed down to the {floor}-pixel floor (requested {requested_pixels} pixels)"
    )]
    AllocationExhausted {
        requested_pixels: usize,
        floor: usize,
    },

    #[error("unsupported output channel count {channels}: must be 1, 3, or 4")]
    UnsupportedComponentCount { channels: usize },

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("component planes do not cover the requested pixel range")]
    PlaneRangeMismatch,

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("pixel layout mismatch: expected {expected:?}, got {actual:?}")]
    LayoutMismatch {
        expected: crate::PixelLayout,
        actual: crate::PixelLayout,
    },
}

impl Jp2Error {
    /// Build an engine-stage failure from a collaborator's message.
    pub fn engine(stage: EngineStage, message: impl Into<String>) -> Self {
        Jp2Error::Engine {
            stage,
            message: message.into(),
        }
    }
}

/// Process exit code for a finished decode: 0 on success, 1 on any fatal
/// condition.
pub fn exit_code<T>(result: &Result<T, Jp2Error>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
