/// Resource limits for a decode operation.
///
/// All fields default to `None` (no limit). Width/height/pixel limits are
/// checked once against the header before any plane is decoded;
/// `max_memory_bytes` additionally gates every output-buffer allocation, so
/// in chunked mode it participates in the shrink-and-retry loop.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum memory bytes for one output buffer allocation.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Check header dimensions against limits.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), crate::Jp2Error> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(crate::Jp2Error::LimitExceeded(alloc::format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(crate::Jp2Error::LimitExceeded(alloc::format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(crate::Jp2Error::LimitExceeded(alloc::format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        Ok(())
    }

    /// Whether an allocation of `bytes` fits within the memory limit.
    pub(crate) fn memory_allows(&self, bytes: usize) -> bool {
        match self.max_memory_bytes {
            Some(max_mem) => bytes as u64 <= max_mem,
            None => true,
        }
    }
}
