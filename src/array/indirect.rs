//! Indirect Arrays
//!
//! Variable-length records addressed through a pointer table.
//!
//! ## Payload Layout
//! ```text
//! starts_at
//! │
//! ▼
//! ┌──────────────┬──────────────────────────────────┬─────────────────────┐
//! │ PtrTable: u64│ [Len: u32][Bytes] [Len][Bytes]...│ [Off: u64] [Off]... │
//! └──────────────┴──────────────────────────────────┴─────────────────────┘
//!                ▲ data_start                       ▲ pointer_table       ▲ ends_at
//! ```
//!
//! Pointer entries are offsets from `data_start`. Records are packed in
//! ordinal order with no gaps, so record `id + 1` starts right after
//! record `id`. Range reads and scans rely on that.

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use futures::stream::BoxStream;

use crate::buffer::{u32_le, u64_le};
use crate::cache::RecordCache;
use crate::error::{DiskArrayError, Result};
use crate::file::RandomAccessFile;
use crate::format::{
    ArrayHeader, LayoutKind, LENGTH_PREFIX_SIZE, POINTER_SIZE, POINTER_TABLE_OFFSET_SIZE,
};
use crate::search;
use crate::serializer::Serializer;

use super::scan::{scan_stream, Framing, LinearScan};
use super::{check_id, check_range};

/// Reader over a variable-length-record array
pub struct IndirectArray<T> {
    header: ArrayHeader,
    /// Absolute offset of the first record's length prefix
    data_start: u64,
    /// Absolute offset of the first pointer entry
    pointer_table: u64,
    file: Arc<RandomAccessFile>,
    serializer: Arc<dyn Serializer<T>>,
    cache: Arc<dyn RecordCache<u64, T>>,
}

impl<T> IndirectArray<T>
where
    T: Send + Sync + 'static,
{
    /// Bind a reader to `header`, reading and checking the pointer-table
    /// offset
    pub(crate) fn new(
        header: ArrayHeader,
        file: Arc<RandomAccessFile>,
        serializer: Arc<dyn Serializer<T>>,
        cache: Arc<dyn RecordCache<u64, T>>,
    ) -> Result<Self> {
        if header.layout != LayoutKind::Indirect {
            return Err(DiskArrayError::Corruption(format!(
                "expected an indirect array, found {:?}",
                header.layout
            )));
        }
        if header.payload_len < POINTER_TABLE_OFFSET_SIZE {
            return Err(DiskArrayError::Corruption(format!(
                "indirect payload of {} bytes has no pointer-table offset",
                header.payload_len
            )));
        }

        let relative = u64_le(&file.read_vec_at(header.starts_at, 8)?)?;
        let (data_start, pointer_table) =
            locate_pointer_table(&header, relative).ok_or_else(|| {
                DiskArrayError::Corruption(format!(
                    "pointer table at +{} for {} records does not end at payload end {}",
                    relative,
                    header.record_count,
                    header.ends_at()
                ))
            })?;

        Ok(Self {
            header,
            data_start,
            pointer_table,
            file,
            serializer,
            cache,
        })
    }

    pub fn len(&self) -> u64 {
        self.header.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.header.record_count == 0
    }

    pub fn header(&self) -> &ArrayHeader {
        &self.header
    }

    /// Size of the data region in bytes
    fn data_len(&self) -> u64 {
        self.pointer_table - self.data_start
    }

    // =========================================================================
    // Raw reads (no bounds check, no cache)
    // =========================================================================

    fn read_pointer(&self, id: u64) -> Result<u64> {
        let bytes = self
            .file
            .read_vec_at(self.pointer_table + id * POINTER_SIZE, POINTER_SIZE as usize)?;
        self.check_pointer(u64_le(&bytes)?)
    }

    async fn read_pointer_async(&self, id: u64) -> Result<u64> {
        let bytes = self
            .file
            .read_at_async(self.pointer_table + id * POINTER_SIZE, POINTER_SIZE as usize)
            .await?;
        self.check_pointer(u64_le(&bytes)?)
    }

    fn check_pointer(&self, pointer: u64) -> Result<u64> {
        if pointer > self.data_len() {
            return Err(DiskArrayError::Corruption(format!(
                "record pointer {} lies past the data region ({} bytes)",
                pointer,
                self.data_len()
            )));
        }
        Ok(pointer)
    }

    /// Check a length prefix read at `pointer` and return the payload offset
    fn record_body(&self, pointer: u64, len: u32) -> Result<u64> {
        let body = pointer + LENGTH_PREFIX_SIZE;
        if body + len as u64 > self.data_len() {
            return Err(DiskArrayError::Corruption(format!(
                "record at +{} with length {} overruns the data region",
                pointer, len
            )));
        }
        Ok(self.data_start + body)
    }

    fn read_record(&self, id: u64) -> Result<T> {
        // Step 1: pointer
        let pointer = self.read_pointer(id)?;

        // Step 2: length prefix
        let prefix = self
            .file
            .read_vec_at(self.data_start + pointer, LENGTH_PREFIX_SIZE as usize)?;
        let len = u32_le(&prefix)?;

        // Step 3: payload
        let body = self.record_body(pointer, len)?;
        let bytes = self.file.read_vec_at(body, len as usize)?;
        self.serializer.deserialize(&bytes)
    }

    async fn read_record_async(&self, id: u64) -> Result<T> {
        let pointer = self.read_pointer_async(id).await?;

        let prefix = self
            .file
            .read_at_async(self.data_start + pointer, LENGTH_PREFIX_SIZE as usize)
            .await?;
        let len = u32_le(&prefix)?;

        let body = self.record_body(pointer, len)?;
        let bytes = self.file.read_at_async(body, len as usize).await?;
        self.serializer.deserialize(&bytes)
    }

    fn read_cached(&self, id: u64) -> Result<T> {
        self.cache.get_or_load(id, || self.read_record(id))
    }

    async fn read_cached_async(&self, id: u64) -> Result<T> {
        self.cache
            .get_or_load_async(id, self.read_record_async(id))
            .await
    }

    /// Split a span of packed `[len][bytes]` records into `count` values
    fn decode_span(&self, span: &[u8], count: u64) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(count as usize);
        let mut pos = 0usize;

        for _ in 0..count {
            let len = u32_le(span.get(pos..).unwrap_or_default())? as usize;
            pos += LENGTH_PREFIX_SIZE as usize;

            let record = span.get(pos..pos + len).ok_or_else(|| {
                DiskArrayError::Corruption(format!(
                    "record of {} bytes overruns a {} byte range read",
                    len,
                    span.len()
                ))
            })?;
            values.push(self.serializer.deserialize(record)?);
            pos += len;
        }
        Ok(values)
    }

    /// Pointer one past record `end - 1`
    fn span_end(&self, end: u64) -> Result<u64> {
        if end == self.len() {
            Ok(self.data_len())
        } else {
            self.read_pointer(end)
        }
    }

    async fn span_end_async(&self, end: u64) -> Result<u64> {
        if end == self.len() {
            Ok(self.data_len())
        } else {
            self.read_pointer_async(end).await
        }
    }

    fn span_len(first: u64, last: u64) -> Result<usize> {
        if last < first {
            return Err(DiskArrayError::Corruption(format!(
                "record pointers go backwards ({} after {})",
                last, first
            )));
        }
        Ok((last - first) as usize)
    }

    // =========================================================================
    // Point and range reads
    // =========================================================================

    /// Record at ordinal `id`
    pub fn get(&self, id: u64) -> Result<T> {
        check_id(id, self.len())?;
        self.read_cached(id)
    }

    /// Records `[start, end)`, read as one contiguous span
    pub fn get_range(&self, start: u64, end: u64) -> Result<Vec<T>> {
        check_range(start, end, self.len())?;
        if start == end {
            return Ok(Vec::new());
        }

        let first = self.read_pointer(start)?;
        let last = self.span_end(end)?;
        let span = self
            .file
            .read_vec_at(self.data_start + first, Self::span_len(first, last)?)?;
        self.decode_span(&span, end - start)
    }

    pub async fn get_async(&self, id: u64) -> Result<T> {
        check_id(id, self.len())?;
        self.read_cached_async(id).await
    }

    pub async fn get_range_async(&self, start: u64, end: u64) -> Result<Vec<T>> {
        check_range(start, end, self.len())?;
        if start == end {
            return Ok(Vec::new());
        }

        let first = self.read_pointer_async(start).await?;
        let last = self.span_end_async(end).await?;
        let span = self
            .file
            .read_at_async(self.data_start + first, Self::span_len(first, last)?)
            .await?;
        self.decode_span(&span, end - start)
    }

    // =========================================================================
    // Scans
    // =========================================================================

    pub fn linear_scan(&self) -> Result<LinearScan<T>> {
        LinearScan::new(
            &self.file,
            self.data_start,
            self.data_start + self.data_len(),
            self.len(),
            Framing::LengthPrefixed,
            Arc::clone(&self.serializer),
        )
    }

    pub fn linear_scan_async(&self) -> BoxStream<'static, Result<T>> {
        scan_stream(
            Arc::clone(&self.file),
            self.data_start,
            self.data_start + self.data_len(),
            self.len(),
            Framing::LengthPrefixed,
            Arc::clone(&self.serializer),
        )
    }

    // =========================================================================
    // Search
    // =========================================================================

    pub fn binary_search_by<F>(&self, compare: F) -> Result<Option<(u64, T)>>
    where
        F: FnMut(&T) -> Ordering,
    {
        search::binary_search_by(self.len(), |id| self.read_cached(id), compare)
    }

    pub fn equal_range_by<F>(&self, compare: F) -> Result<Range<u64>>
    where
        F: FnMut(&T) -> Ordering,
    {
        search::equal_range_by(self.len(), |id| self.read_cached(id), compare)
    }

    pub fn binary_search_by_key<K, F>(&self, key: &K, mut key_fn: F) -> Result<Option<(u64, T)>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        self.binary_search_by(|record| key_fn(record).cmp(key))
    }

    pub fn equal_range_by_key<K, F>(&self, key: &K, mut key_fn: F) -> Result<Range<u64>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        self.equal_range_by(|record| key_fn(record).cmp(key))
    }

    pub async fn binary_search_by_async<F>(&self, compare: F) -> Result<Option<(u64, T)>>
    where
        F: FnMut(&T) -> Ordering,
    {
        search::binary_search_by_async(self.len(), |id| self.read_cached_async(id), compare).await
    }

    pub async fn equal_range_by_async<F>(&self, compare: F) -> Result<Range<u64>>
    where
        F: FnMut(&T) -> Ordering,
    {
        search::equal_range_by_async(self.len(), |id| self.read_cached_async(id), compare).await
    }

    pub async fn binary_search_by_key_async<K, F>(
        &self,
        key: &K,
        mut key_fn: F,
    ) -> Result<Option<(u64, T)>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        self.binary_search_by_async(|record| key_fn(record).cmp(key))
            .await
    }

    pub async fn equal_range_by_key_async<K, F>(&self, key: &K, mut key_fn: F) -> Result<Range<u64>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        self.equal_range_by_async(|record| key_fn(record).cmp(key))
            .await
    }
}

/// Absolute `(data_start, pointer_table)` when the table ends exactly at the
/// payload end
fn locate_pointer_table(header: &ArrayHeader, relative: u64) -> Option<(u64, u64)> {
    if relative < POINTER_TABLE_OFFSET_SIZE {
        return None;
    }
    let pointer_table = header.starts_at.checked_add(relative)?;
    let table_len = header.record_count.checked_mul(POINTER_SIZE)?;
    if pointer_table.checked_add(table_len)? != header.ends_at() {
        return None;
    }
    Some((header.starts_at + POINTER_TABLE_OFFSET_SIZE, pointer_table))
}

impl<T> std::fmt::Debug for IndirectArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndirectArray")
            .field("header", &self.header)
            .field("pointer_table", &self.pointer_table)
            .finish()
    }
}
