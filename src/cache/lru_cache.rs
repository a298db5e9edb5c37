//! LRU record cache backed by the `lru` crate.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{DiskArrayError, Result};

use super::RecordCache;

type EvictionCallback<V> = Box<dyn Fn(V) + Send + Sync>;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Least-recently-used cache with a fixed capacity
///
/// ## Concurrency:
/// - `entries`: one mutex, held only for map bookkeeping
/// - counters: atomics (lock-free)
/// - the eviction callback runs after the mutex is released
pub struct LruRecordCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, V>>,
    capacity: usize,
    on_evict: Option<EvictionCallback<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K: Hash + Eq, V> LruRecordCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Result<Self> {
        let cap = NonZeroUsize::new(capacity).ok_or_else(|| {
            DiskArrayError::Config("LRU cache capacity must be non-zero".to_string())
        })?;

        Ok(Self {
            entries: Mutex::new(LruCache::new(cap)),
            capacity,
            on_evict: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    /// Create a cache that hands every evicted value to `on_evict`
    pub fn with_eviction_callback<F>(capacity: usize, on_evict: F) -> Result<Self>
    where
        F: Fn(V) + Send + Sync + 'static,
    {
        let mut cache = Self::new(capacity)?;
        cache.on_evict = Some(Box::new(on_evict));
        Ok(cache)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Whether `key` is cached, without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains(key)
    }
}

impl<K, V> RecordCache<K, V> for LruRecordCache<K, V>
where
    K: Hash + Eq + Send + Sync,
    V: Clone + Send + Sync,
{
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let found = self.entries.lock().get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    fn store(&self, key: K, value: V) -> V {
        let evicted = {
            let mut entries = self.entries.lock();

            // A concurrent loader got here first; keep its value
            if let Some(existing) = entries.get(&key) {
                return existing.clone();
            }
            entries.push(key, value.clone())
        };

        if let Some((_, old)) = evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            if let Some(on_evict) = &self.on_evict {
                on_evict(old);
            }
        }
        value
    }
}
