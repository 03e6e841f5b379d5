//! Output and diagnostic collaborator interfaces.
//!
//! [`RasterSink`] receives the packed bytes; [`Diagnostics`] receives
//! non-fatal notices. Fatal conditions travel back to the caller as
//! [`Jp2Error`](crate::Jp2Error) — which channel a condition uses is part of
//! the observable contract.

use alloc::vec::Vec;

use crate::error::Jp2Error;

/// Receives packed output windows during a decode.
///
/// # Contract
///
/// - [`reserve`](RasterSink::reserve) is called exactly once per decode,
///   before any write, with the total output size in bytes.
/// - [`write`](RasterSink::write) calls arrive in increasing offset order
///   and tile the reserved range with no gaps or overlaps.
/// - The byte slice is only valid for the duration of the call; the sink
///   must copy what it wants to keep.
/// - On a failed decode the sink may have seen a prefix of the range, but
///   never a partially packed window.
///
/// # Object safety
///
/// This trait is object-safe. Use `&mut dyn RasterSink` in generic code.
pub trait RasterSink {
    /// Announce the total byte size of the image about to be delivered.
    fn reserve(&mut self, total_bytes: usize) -> Result<(), Jp2Error>;

    /// Deliver one packed window at `byte_offset` within the reserved range.
    fn write(&mut self, bytes: &[u8], byte_offset: usize);
}

/// Non-fatal warning channel.
///
/// The pipeline itself only emits the chunk size-reduction notice here;
/// engine implementations may route their own warnings through the same
/// object.
pub trait Diagnostics {
    fn warning(&mut self, message: &str);
}

/// `Diagnostics` that discards all warnings.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn warning(&mut self, _message: &str) {}
}

/// Sink that collects the full image into one contiguous buffer.
#[derive(Clone, Debug, Default)]
pub struct VecSink {
    buf: Vec<u8>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl RasterSink for VecSink {
    fn reserve(&mut self, total_bytes: usize) -> Result<(), Jp2Error> {
        self.buf.try_reserve_exact(total_bytes).map_err(|_| {
            Jp2Error::LimitExceeded(alloc::format!(
                "cannot allocate {total_bytes}-byte output buffer"
            ))
        })?;
        self.buf.resize(total_bytes, 0);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8], byte_offset: usize) {
        self.buf[byte_offset..byte_offset + bytes.len()].copy_from_slice(bytes);
    }
}
