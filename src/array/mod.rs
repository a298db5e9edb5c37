//! Disk Array Module
//!
//! Typed readers over one array of a finished database file.
//!
//! ## Responsibilities
//! - Point lookups, range reads and linear scans straight from disk
//! - Binary search and equal-range search over sorted arrays
//! - Sync and async flavours of every operation
//!
//! ## Layouts
//! ```text
//! ┌──────────────────┬─────────────────────────────────────────────┐
//! │ ClusteredArray   │ fixed-length records, offset = id * len     │
//! │ IndirectArray    │ [len][bytes] records + pointer table        │
//! └──────────────────┴─────────────────────────────────────────────┘
//! ```
//!
//! Every record read used by `get` and by searches goes through the
//! reader's record cache; range reads and scans bypass it.

mod clustered;
mod indirect;
mod scan;

pub use clustered::ClusteredArray;
pub use indirect::IndirectArray;
pub use scan::LinearScan;

use std::cmp::Ordering;
use std::ops::Range;

use futures::stream::BoxStream;

use crate::error::{DiskArrayError, Result};
use crate::format::{ArrayHeader, LayoutKind};

/// `id` must address an existing record
pub(crate) fn check_id(id: u64, len: u64) -> Result<()> {
    if id >= len {
        return Err(DiskArrayError::OutOfRange { id, len });
    }
    Ok(())
}

/// `[start, end)` must be ordered and within `[0, len]`
pub(crate) fn check_range(start: u64, end: u64, len: u64) -> Result<()> {
    if start > end {
        return Err(DiskArrayError::InvalidRange { start, end });
    }
    if end > len {
        return Err(DiskArrayError::OutOfRange { id: end, len });
    }
    Ok(())
}

/// Reader over either array layout
#[derive(Debug)]
pub enum DiskArray<T> {
    Clustered(ClusteredArray<T>),
    Indirect(IndirectArray<T>),
}

macro_rules! dispatch {
    ($self:ident, $array:ident => $body:expr) => {
        match $self {
            DiskArray::Clustered($array) => $body,
            DiskArray::Indirect($array) => $body,
        }
    };
}

impl<T> DiskArray<T>
where
    T: Send + Sync + 'static,
{
    pub fn layout(&self) -> LayoutKind {
        match self {
            DiskArray::Clustered(_) => LayoutKind::Clustered,
            DiskArray::Indirect(_) => LayoutKind::Indirect,
        }
    }

    pub fn header(&self) -> &ArrayHeader {
        dispatch!(self, array => array.header())
    }

    pub fn len(&self) -> u64 {
        dispatch!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, array => array.is_empty())
    }

    pub fn get(&self, id: u64) -> Result<T> {
        dispatch!(self, array => array.get(id))
    }

    pub fn get_range(&self, start: u64, end: u64) -> Result<Vec<T>> {
        dispatch!(self, array => array.get_range(start, end))
    }

    pub fn linear_scan(&self) -> Result<LinearScan<T>> {
        dispatch!(self, array => array.linear_scan())
    }

    pub fn binary_search_by<F>(&self, compare: F) -> Result<Option<(u64, T)>>
    where
        F: FnMut(&T) -> Ordering,
    {
        dispatch!(self, array => array.binary_search_by(compare))
    }

    pub fn binary_search_by_key<K, F>(&self, key: &K, key_fn: F) -> Result<Option<(u64, T)>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        dispatch!(self, array => array.binary_search_by_key(key, key_fn))
    }

    pub fn equal_range_by<F>(&self, compare: F) -> Result<Range<u64>>
    where
        F: FnMut(&T) -> Ordering,
    {
        dispatch!(self, array => array.equal_range_by(compare))
    }

    pub fn equal_range_by_key<K, F>(&self, key: &K, key_fn: F) -> Result<Range<u64>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        dispatch!(self, array => array.equal_range_by_key(key, key_fn))
    }

    // =========================================================================
    // Async
    // =========================================================================

    pub async fn get_async(&self, id: u64) -> Result<T> {
        dispatch!(self, array => array.get_async(id).await)
    }

    pub async fn get_range_async(&self, start: u64, end: u64) -> Result<Vec<T>> {
        dispatch!(self, array => array.get_range_async(start, end).await)
    }

    pub fn linear_scan_async(&self) -> BoxStream<'static, Result<T>> {
        dispatch!(self, array => array.linear_scan_async())
    }

    pub async fn binary_search_by_async<F>(&self, compare: F) -> Result<Option<(u64, T)>>
    where
        F: FnMut(&T) -> Ordering,
    {
        dispatch!(self, array => array.binary_search_by_async(compare).await)
    }

    pub async fn binary_search_by_key_async<K, F>(
        &self,
        key: &K,
        key_fn: F,
    ) -> Result<Option<(u64, T)>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        dispatch!(self, array => array.binary_search_by_key_async(key, key_fn).await)
    }

    pub async fn equal_range_by_async<F>(&self, compare: F) -> Result<Range<u64>>
    where
        F: FnMut(&T) -> Ordering,
    {
        dispatch!(self, array => array.equal_range_by_async(compare).await)
    }

    pub async fn equal_range_by_key_async<K, F>(&self, key: &K, key_fn: F) -> Result<Range<u64>>
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        dispatch!(self, array => array.equal_range_by_key_async(key, key_fn).await)
    }
}
