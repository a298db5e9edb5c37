//! Format Module
//!
//! On-disk layout shared by builders and readers.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ File Header (24 bytes)                                  │
//! │   Marker: u64 (8) | Schema Id: UUID (16)                │
//! │   (marker 0 = under construction, 1 = finalized)        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Array Header (24 bytes)                                 │
//! │   RecordCount: u64 | PayloadLen: u64 | Layout: u64      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Array Payload (PayloadLen bytes)                        │
//! │   clustered: [Record][Record]...  (fixed length)        │
//! │   indirect:  [PtrTableOffset: u64]                      │
//! │              [Len: u32][Bytes] ... (data region)        │
//! │              [Offset: u64] ... (one per record)         │
//! ├─────────────────────────────────────────────────────────┤
//! │ ... next array header + payload, in declaration order   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Indirect pointer-table offsets are
//! relative to the start of the data region; the pointer-table offset
//! itself is relative to the start of the payload.

mod header;

pub use header::{ArrayHeader, LayoutKind};

use bytes::{Buf, BufMut, BytesMut};
use uuid::Uuid;

use crate::error::{DiskArrayError, Result};

// =============================================================================
// Shared Constants (used by builders and readers)
// =============================================================================

/// Marker value while the file is being written
pub const MARKER_BUILDING: u64 = 0;

/// Marker value once every array has been written
pub const MARKER_FINALIZED: u64 = 1;

/// File header size: Marker (8) + Schema Id (16) = 24 bytes
pub const FILE_HEADER_SIZE: u64 = 24;

/// Array header size: RecordCount (8) + PayloadLen (8) + Layout (8) = 24 bytes
pub const ARRAY_HEADER_SIZE: u64 = 24;

/// Size of the pointer-table offset that opens an indirect payload
pub const POINTER_TABLE_OFFSET_SIZE: u64 = 8;

/// Size of one pointer-table entry
pub const POINTER_SIZE: u64 = 8;

/// Size of the length prefix in front of each indirect record
pub const LENGTH_PREFIX_SIZE: u64 = 4;

// =============================================================================
// File Header
// =============================================================================

/// The 24 bytes at the start of every database file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub marker: u64,
    pub schema_id: Uuid,
}

impl FileHeader {
    pub fn building(schema_id: Uuid) -> Self {
        Self {
            marker: MARKER_BUILDING,
            schema_id,
        }
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE as usize] {
        let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE as usize);
        buf.put_u64_le(self.marker);
        buf.put_slice(self.schema_id.as_bytes());

        let mut out = [0u8; FILE_HEADER_SIZE as usize];
        out.copy_from_slice(&buf);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_HEADER_SIZE as usize {
            return Err(DiskArrayError::Corruption(format!(
                "file header needs {} bytes, got {}",
                FILE_HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut buf = bytes;
        let marker = buf.get_u64_le();
        let mut id = [0u8; 16];
        buf.copy_to_slice(&mut id);

        Ok(Self {
            marker,
            schema_id: Uuid::from_bytes(id),
        })
    }

    /// Check that the file is finalized and carries the expected schema id
    pub fn validate(&self, expected: Uuid) -> Result<()> {
        if self.marker != MARKER_FINALIZED {
            return Err(DiskArrayError::Corruption(format!(
                "format marker is {}, file was not finalized",
                self.marker
            )));
        }
        if self.schema_id != expected {
            return Err(DiskArrayError::Corruption(format!(
                "schema id mismatch: file has {}, expected {}",
                self.schema_id, expected
            )));
        }
        Ok(())
    }
}
