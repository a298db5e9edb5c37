//! Search over sorted records
//!
//! Binary searches that never materialize the array: every probe goes
//! through an injected "read record by ordinal" function, so the same code
//! serves disk-resident arrays, cached readers and plain slices.
//!
//! The comparison closure orders a record relative to the lookup key:
//! `Less` means the record sorts before the key.
//!
//! ## Bounds
//! ```text
//!   ordinals:   0    1    2    3    4    5
//!   keys:       1    3    3    3    7    9
//!   lookup 3:        ^lower         ^upper      equal range = 1..4
//!   lookup 5:                       ^lower = upper = 4 (insertion point)
//! ```

use std::cmp::Ordering;
use std::future::Future;
use std::ops::Range;

use crate::error::Result;

/// Midpoint of `[lo, hi)` without overflow
#[inline]
fn midpoint(lo: u64, hi: u64) -> u64 {
    lo + (hi - lo) / 2
}

/// First ordinal in `[0, count]` whose record does not sort before the key
pub fn lower_bound_by<T, R, F>(count: u64, mut read: R, mut compare: F) -> Result<u64>
where
    R: FnMut(u64) -> Result<T>,
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = midpoint(lo, hi);
        if compare(&read(mid)?) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// First ordinal in `[0, count]` whose record sorts after the key
pub fn upper_bound_by<T, R, F>(count: u64, mut read: R, mut compare: F) -> Result<u64>
where
    R: FnMut(u64) -> Result<T>,
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = midpoint(lo, hi);
        if compare(&read(mid)?) == Ordering::Greater {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(lo)
}

/// Span of records comparing equal to the key, as two independent bounds
pub fn equal_range_by<T, R, F>(count: u64, mut read: R, mut compare: F) -> Result<Range<u64>>
where
    R: FnMut(u64) -> Result<T>,
    F: FnMut(&T) -> Ordering,
{
    let start = lower_bound_by(count, &mut read, &mut compare)?;
    let end = upper_bound_by(count, &mut read, &mut compare)?;
    Ok(start..end)
}

/// Three-way midpoint descent.
///
/// Returns the first matching ordinal the descent reaches. With duplicate
/// keys that may be any ordinal of the equal range.
pub fn binary_search_by<T, R, F>(
    count: u64,
    mut read: R,
    mut compare: F,
) -> Result<Option<(u64, T)>>
where
    R: FnMut(u64) -> Result<T>,
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = midpoint(lo, hi);
        let record = read(mid)?;
        match compare(&record) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Ok(Some((mid, record))),
        }
    }
    Ok(None)
}

// =============================================================================
// Async variants
// =============================================================================

/// Async twin of [`lower_bound_by`]
pub async fn lower_bound_by_async<T, R, Fut, F>(
    count: u64,
    mut read: R,
    mut compare: F,
) -> Result<u64>
where
    R: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = midpoint(lo, hi);
        if compare(&read(mid).await?) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Async twin of [`upper_bound_by`]
pub async fn upper_bound_by_async<T, R, Fut, F>(
    count: u64,
    mut read: R,
    mut compare: F,
) -> Result<u64>
where
    R: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = midpoint(lo, hi);
        if compare(&read(mid).await?) == Ordering::Greater {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(lo)
}

/// Async twin of [`equal_range_by`]
pub async fn equal_range_by_async<T, R, Fut, F>(
    count: u64,
    mut read: R,
    mut compare: F,
) -> Result<Range<u64>>
where
    R: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
    F: FnMut(&T) -> Ordering,
{
    let start = lower_bound_by_async(count, &mut read, &mut compare).await?;
    let end = upper_bound_by_async(count, &mut read, &mut compare).await?;
    Ok(start..end)
}

/// Async twin of [`binary_search_by`]
pub async fn binary_search_by_async<T, R, Fut, F>(
    count: u64,
    mut read: R,
    mut compare: F,
) -> Result<Option<(u64, T)>>
where
    R: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T>>,
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, count);
    while lo < hi {
        let mid = midpoint(lo, hi);
        let record = read(mid).await?;
        match compare(&record) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Ok(Some((mid, record))),
        }
    }
    Ok(None)
}
