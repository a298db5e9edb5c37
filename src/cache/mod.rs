//! Record Cache Module
//!
//! Pluggable cache sitting between a reader's raw "read record by ordinal"
//! primitive and its callers. A hit skips all I/O.
//!
//! ## Locking
//! Implementations lock only around their own bookkeeping. The loader that
//! produces a missing value runs outside the cache lock, so the cache lock
//! and the file lock never nest. When two loaders race for the same key the
//! first value stored wins and is returned to both callers.

mod lru_cache;
mod noop;

pub use lru_cache::{CacheStats, LruRecordCache};
pub use noop::NoCache;

use std::future::Future;

use crate::error::Result;

/// Capacity-bounded cache contract
pub trait RecordCache<K, V>: Send + Sync {
    /// Maximum number of entries kept (0 for a pass-through cache)
    fn capacity(&self) -> usize;

    /// Number of entries currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value for `key`, marking it most recently used
    fn lookup(&self, key: &K) -> Option<V>;

    /// Insert `value` unless another caller stored `key` first.
    ///
    /// Returns the value that ends up cached (or `value` itself when the
    /// cache keeps nothing).
    fn store(&self, key: K, value: V) -> V;
}

impl<K, V> dyn RecordCache<K, V> + '_ {
    /// Return the cached value or run `load` and cache its result
    pub fn get_or_load<F>(&self, key: K, load: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }
        let value = load()?;
        Ok(self.store(key, value))
    }

    /// Async twin of [`get_or_load`](Self::get_or_load)
    pub async fn get_or_load_async<F>(&self, key: K, load: F) -> Result<V>
    where
        F: Future<Output = Result<V>>,
    {
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }
        let value = load.await?;
        Ok(self.store(key, value))
    }
}
