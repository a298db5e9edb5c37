//! Buffer utilities
//!
//! Growable serialization buffers and exact reads over any `Read`.

use std::io::{self, Read};

use crate::error::{DiskArrayError, Result};
use crate::serializer::{Encoded, Serializer};

/// Geometric growth policy for serialization buffers
#[derive(Debug, Clone, Copy)]
pub struct GrowthPolicy {
    factor: usize,
}

impl GrowthPolicy {
    /// `factor` below 2 is raised to 2 so that growth always makes progress
    pub fn new(factor: usize) -> Self {
        Self {
            factor: factor.max(2),
        }
    }

    /// Next buffer size after `current` proved too small.
    ///
    /// Honours the serializer's size hint when it asks for more than a
    /// plain geometric step.
    pub fn next_size(&self, current: usize, required: Option<usize>) -> usize {
        let stepped = current.max(1).saturating_mul(self.factor);
        match required {
            Some(required) if required > stepped => required,
            _ => stepped,
        }
    }

    /// Grow `buffer` in place (contents are not preserved)
    pub fn grow(&self, buffer: &mut Vec<u8>, required: Option<usize>) {
        let next = self.next_size(buffer.len(), required);
        buffer.clear();
        buffer.resize(next, 0);
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Make sure `buffer` holds at least `len` bytes
pub fn ensure_len(buffer: &mut Vec<u8>, len: usize) {
    if buffer.len() < len {
        buffer.resize(len, 0);
    }
}

/// Serialize `value` into `buffer`, growing it until the serializer succeeds.
///
/// Returns the number of bytes used at the start of `buffer`.
pub fn serialize_growing<T>(
    serializer: &dyn Serializer<T>,
    value: &T,
    buffer: &mut Vec<u8>,
    policy: GrowthPolicy,
) -> Result<usize> {
    loop {
        match serializer.try_serialize(value, buffer.as_mut_slice())? {
            Encoded::Written(len) if len <= buffer.len() => return Ok(len),
            Encoded::Written(len) => {
                return Err(DiskArrayError::Serialization(format!(
                    "serializer reported {} bytes written into a {} byte buffer",
                    len,
                    buffer.len()
                )))
            }
            Encoded::BufferTooSmall { required } => policy.grow(buffer, required),
        }
    }
}

/// `read_exact` that reports a short read as [`DiskArrayError::UnexpectedEof`]
pub fn read_exact_at<R: Read>(reader: &mut R, offset: u64, buf: &mut [u8]) -> Result<()> {
    let len = buf.len();
    reader.read_exact(buf).map_err(|e| short_read(e, offset, len))
}

/// Map an I/O error from a read of `len` bytes at `offset`
pub(crate) fn short_read(err: io::Error, offset: u64, len: usize) -> DiskArrayError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => DiskArrayError::UnexpectedEof { offset, len },
        _ => DiskArrayError::Io(err),
    }
}

/// Decode a little-endian u64 from the first 8 bytes of `bytes`
pub(crate) fn u64_le(bytes: &[u8]) -> Result<u64> {
    bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| DiskArrayError::Corruption(format!("expected 8 bytes, got {}", bytes.len())))
}

/// Decode a little-endian u32 from the first 4 bytes of `bytes`
pub(crate) fn u32_le(bytes: &[u8]) -> Result<u32> {
    bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| DiskArrayError::Corruption(format!("expected 4 bytes, got {}", bytes.len())))
}
