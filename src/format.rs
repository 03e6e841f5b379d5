//! Fixed-position magic-number sniffing for the two codestream flavors.

use crate::error::Jp2Error;

/// Which decompressor the engine should instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecKind {
    /// Boxed JP2 container.
    Jp2,
    /// Bare JPEG 2000 codestream.
    J2k,
}

/// JP2 signature box content (also accepted bare at offset 0).
const JP2_MAGIC: [u8; 4] = [0x0D, 0x0A, 0x87, 0x0A];

/// Full RFC 3745 signature box: length 12, type "jP  ", signature content.
const JP2_RFC3745_MAGIC: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

/// SOC marker followed by SIZ: start of a raw codestream.
const J2K_CODESTREAM_MAGIC: [u8; 4] = [0xFF, 0x4F, 0xFF, 0x51];

/// Detect the codestream flavor from the first bytes of `data`.
///
/// Anything that matches neither magic is a fatal [`Jp2Error::UnknownFormat`];
/// no bytes are emitted and no warning fires for this condition.
pub fn detect(data: &[u8]) -> Result<CodecKind, Jp2Error> {
    if data.starts_with(&JP2_MAGIC) || data.starts_with(&JP2_RFC3745_MAGIC) {
        Ok(CodecKind::Jp2)
    } else if data.starts_with(&J2K_CODESTREAM_MAGIC) {
        Ok(CodecKind::J2k)
    } else {
        Err(Jp2Error::UnknownFormat)
    }
}
