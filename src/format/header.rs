//! Array headers.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{DiskArrayError, Result};

use super::ARRAY_HEADER_SIZE;

/// How an array's records are laid out in its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    /// Fixed-length records addressed by arithmetic
    Clustered,
    /// Length-prefixed records addressed through a pointer table
    Indirect,
}

impl LayoutKind {
    pub fn code(self) -> u64 {
        match self {
            LayoutKind::Clustered => 1,
            LayoutKind::Indirect => 2,
        }
    }

    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            1 => Ok(LayoutKind::Clustered),
            2 => Ok(LayoutKind::Indirect),
            other => Err(DiskArrayError::Corruption(format!(
                "unknown array layout kind {}",
                other
            ))),
        }
    }
}

/// Metadata written in front of each array payload
///
/// `starts_at` is derived when the header is parsed (it is the offset just
/// past the header) and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader {
    pub record_count: u64,
    pub payload_len: u64,
    pub layout: LayoutKind,
    pub starts_at: u64,
}

impl ArrayHeader {
    /// Offset one past the last payload byte
    pub fn ends_at(&self) -> u64 {
        self.starts_at + self.payload_len
    }

    /// Common record length of a clustered array.
    ///
    /// An empty array has no records to measure and reports `None`.
    pub fn record_length(&self) -> Result<Option<u64>> {
        if self.record_count == 0 {
            if self.payload_len != 0 {
                return Err(DiskArrayError::Corruption(format!(
                    "empty array claims {} payload bytes",
                    self.payload_len
                )));
            }
            return Ok(None);
        }

        if self.payload_len % self.record_count != 0 || self.payload_len == 0 {
            return Err(DiskArrayError::Corruption(format!(
                "payload of {} bytes does not split into {} equal records",
                self.payload_len, self.record_count
            )));
        }
        Ok(Some(self.payload_len / self.record_count))
    }

    pub fn encode(&self) -> [u8; ARRAY_HEADER_SIZE as usize] {
        let mut buf = BytesMut::with_capacity(ARRAY_HEADER_SIZE as usize);
        buf.put_u64_le(self.record_count);
        buf.put_u64_le(self.payload_len);
        buf.put_u64_le(self.layout.code());

        let mut out = [0u8; ARRAY_HEADER_SIZE as usize];
        out.copy_from_slice(&buf);
        out
    }

    /// Parse a header that was read from `header_offset`
    pub fn decode(header_offset: u64, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ARRAY_HEADER_SIZE as usize {
            return Err(DiskArrayError::Corruption(format!(
                "array header needs {} bytes, got {}",
                ARRAY_HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut buf = bytes;
        let record_count = buf.get_u64_le();
        let payload_len = buf.get_u64_le();
        let layout = LayoutKind::from_code(buf.get_u64_le())?;

        let starts_at = header_offset + ARRAY_HEADER_SIZE;
        if starts_at.checked_add(payload_len).is_none() {
            return Err(DiskArrayError::Corruption(format!(
                "payload length {} overflows the file",
                payload_len
            )));
        }

        Ok(Self {
            record_count,
            payload_len,
            layout,
            starts_at,
        })
    }
}
