//! Linear Scans
//!
//! Sequential iteration over one array's records on an independent read
//! handle. Scans never touch the shared positioned-read handle, so any
//! number of them can run next to point lookups.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::AsyncReadExt;

use crate::buffer::{ensure_len, read_exact_at, short_read};
use crate::error::{DiskArrayError, Result};
use crate::file::RandomAccessFile;
use crate::format::LENGTH_PREFIX_SIZE;
use crate::serializer::Serializer;

/// How consecutive records are delimited in a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Every record is exactly this many bytes
    Fixed(usize),
    /// Every record is `[u32 LE len][bytes]`, packed back to back
    LengthPrefixed,
}

/// A record of `len` bytes at `offset` must end inside the region
fn check_extent(offset: u64, len: usize, end: u64) -> Result<()> {
    match offset.checked_add(len as u64) {
        Some(record_end) if record_end <= end => Ok(()),
        _ => Err(DiskArrayError::Corruption(format!(
            "record at {} with length {} overruns the region ending at {}",
            offset, len, end
        ))),
    }
}

/// Lazy iterator over an array's records in on-disk order
///
/// Stops after the first error.
pub struct LinearScan<T> {
    reader: BufReader<File>,
    framing: Framing,
    remaining: u64,
    /// Absolute offset of the next byte to read
    offset: u64,
    /// Absolute end of the records region
    end: u64,
    buffer: Vec<u8>,
    serializer: Arc<dyn Serializer<T>>,
}

impl<T> LinearScan<T> {
    pub(crate) fn new(
        file: &RandomAccessFile,
        start: u64,
        end: u64,
        count: u64,
        framing: Framing,
        serializer: Arc<dyn Serializer<T>>,
    ) -> Result<Self> {
        let reader = file.open_stream_at(start)?;
        let buffer = match framing {
            Framing::Fixed(len) => vec![0u8; len],
            Framing::LengthPrefixed => Vec::new(),
        };

        Ok(Self {
            reader,
            framing,
            remaining: count,
            offset: start,
            end,
            buffer,
            serializer,
        })
    }

    fn read_next(&mut self) -> Result<T> {
        let len = match self.framing {
            Framing::Fixed(len) => len,
            Framing::LengthPrefixed => {
                let mut prefix = [0u8; LENGTH_PREFIX_SIZE as usize];
                read_exact_at(&mut self.reader, self.offset, &mut prefix)?;
                self.offset += LENGTH_PREFIX_SIZE;
                u32::from_le_bytes(prefix) as usize
            }
        };
        check_extent(self.offset, len, self.end)?;

        ensure_len(&mut self.buffer, len);
        read_exact_at(&mut self.reader, self.offset, &mut self.buffer[..len])?;
        self.offset += len as u64;

        self.serializer.deserialize(&self.buffer[..len])
    }
}

impl<T> Iterator for LinearScan<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match self.read_next() {
            Ok(value) => {
                self.remaining -= 1;
                Some(Ok(value))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}

// =============================================================================
// Async scan
// =============================================================================

struct ScanState<T> {
    file: Arc<RandomAccessFile>,
    /// Opened on first poll
    reader: Option<tokio::io::BufReader<tokio::fs::File>>,
    framing: Framing,
    remaining: u64,
    offset: u64,
    end: u64,
    serializer: Arc<dyn Serializer<T>>,
}

/// Async twin of [`LinearScan`]. The read handle is opened on first poll.
pub(crate) fn scan_stream<T>(
    file: Arc<RandomAccessFile>,
    start: u64,
    end: u64,
    count: u64,
    framing: Framing,
    serializer: Arc<dyn Serializer<T>>,
) -> BoxStream<'static, Result<T>>
where
    T: Send + 'static,
{
    let state = ScanState {
        file,
        reader: None,
        framing,
        remaining: count,
        offset: start,
        end,
        serializer,
    };

    stream::try_unfold(state, |mut state| async move {
        if state.remaining == 0 {
            return Ok(None);
        }

        let mut reader = match state.reader.take() {
            Some(reader) => reader,
            None => state.file.open_stream_at_async(state.offset).await?,
        };

        let len = match state.framing {
            Framing::Fixed(len) => len,
            Framing::LengthPrefixed => {
                let len = reader
                    .read_u32_le()
                    .await
                    .map_err(|e| short_read(e, state.offset, LENGTH_PREFIX_SIZE as usize))?;
                state.offset += LENGTH_PREFIX_SIZE;
                len as usize
            }
        };
        check_extent(state.offset, len, state.end)?;

        let mut bytes = vec![0u8; len];
        reader
            .read_exact(&mut bytes)
            .await
            .map_err(|e| short_read(e, state.offset, len))?;
        state.offset += len as u64;

        let value = state.serializer.deserialize(&bytes)?;
        state.remaining -= 1;
        state.reader = Some(reader);
        Ok(Some((value, state)))
    })
    .boxed()
}
