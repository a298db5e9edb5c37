//! Clustered Arrays
//!
//! Fixed-length records stored back to back. Record `id` lives at
//! `starts_at + id * record_len`, so point and range lookups are a single
//! positioned read each.

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use futures::stream::BoxStream;

use crate::cache::RecordCache;
use crate::error::{DiskArrayError, Result};
use crate::file::RandomAccessFile;
use crate::format::{ArrayHeader, LayoutKind};
use crate::search;
use crate::serializer::Serializer;

use super::scan::{scan_stream, Framing, LinearScan};
use super::{check_id, check_range};

/// Reader over a fixed-length-record array
pub struct ClusteredArray<T> {
    header: ArrayHeader,
    record_len: u64,
    file: Arc<RandomAccessFile>,
    serializer: Arc<dyn Serializer<T>>,
    cache: Arc<dyn RecordCache<u64, T>>,
}

impl<T> ClusteredArray<T>
where
    T: Send + Sync + 'static,
{
    /// Bind a reader to `header`, checking it against the serializer's
    /// declared element size
    pub(crate) fn new(
        header: ArrayHeader,
        element_size: usize,
        file: Arc<RandomAccessFile>,
        serializer: Arc<dyn Serializer<T>>,
        cache: Arc<dyn RecordCache<u64, T>>,
    ) -> Result<Self> {
        if header.layout != LayoutKind::Clustered {
            return Err(DiskArrayError::Corruption(format!(
                "expected a clustered array, found {:?}",
                header.layout
            )));
        }

        let record_len = match header.record_length()? {
            Some(len) if len != element_size as u64 => {
                return Err(DiskArrayError::Corruption(format!(
                    "record length {} does not match element size {}",
                    len, element_size
                )));
            }
            Some(len) => len,
            None => element_size as u64,
        };

        Ok(Self {
            header,
            record_len,
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

    /// Length in bytes of every record
    pub fn record_len(&self) -> u64 {
        self.record_len
    }

    fn offset_of(&self, id: u64) -> u64 {
        self.header.starts_at + id * self.record_len
    }

    // =========================================================================
    // Raw reads (no bounds check, no cache)
    // =========================================================================

    fn read_record(&self, id: u64) -> Result<T> {
        let bytes = self
            .file
            .read_vec_at(self.offset_of(id), self.record_len as usize)?;
        self.serializer.deserialize(&bytes)
    }

    async fn read_record_async(&self, id: u64) -> Result<T> {
        let bytes = self
            .file
            .read_at_async(self.offset_of(id), self.record_len as usize)
            .await?;
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

    fn decode_span(&self, bytes: &[u8]) -> Result<Vec<T>> {
        bytes
            .chunks_exact(self.record_len as usize)
            .map(|record| self.serializer.deserialize(record))
            .collect()
    }

    // =========================================================================
    // Point and range reads
    // =========================================================================

    /// Record at ordinal `id`
    pub fn get(&self, id: u64) -> Result<T> {
        check_id(id, self.len())?;
        self.read_cached(id)
    }

    /// Records `[start, end)` in one positioned read
    pub fn get_range(&self, start: u64, end: u64) -> Result<Vec<T>> {
        check_range(start, end, self.len())?;
        if start == end {
            return Ok(Vec::new());
        }

        let span = ((end - start) * self.record_len) as usize;
        let bytes = self.file.read_vec_at(self.offset_of(start), span)?;
        self.decode_span(&bytes)
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

        let span = ((end - start) * self.record_len) as usize;
        let bytes = self.file.read_at_async(self.offset_of(start), span).await?;
        self.decode_span(&bytes)
    }

    // =========================================================================
    // Scans
    // =========================================================================

    pub fn linear_scan(&self) -> Result<LinearScan<T>> {
        LinearScan::new(
            &self.file,
            self.header.starts_at,
            self.header.ends_at(),
            self.len(),
            Framing::Fixed(self.record_len as usize),
            Arc::clone(&self.serializer),
        )
    }

    pub fn linear_scan_async(&self) -> BoxStream<'static, Result<T>> {
        scan_stream(
            Arc::clone(&self.file),
            self.header.starts_at,
            self.header.ends_at(),
            self.len(),
            Framing::Fixed(self.record_len as usize),
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

impl<T> std::fmt::Debug for ClusteredArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusteredArray")
            .field("header", &self.header)
            .field("record_len", &self.record_len)
            .finish()
    }
}
