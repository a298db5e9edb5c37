//! Pass-through cache used when caching is disabled.

use super::RecordCache;

/// Caches nothing; every lookup misses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl<K, V> RecordCache<K, V> for NoCache {
    fn capacity(&self) -> usize {
        0
    }

    fn len(&self) -> usize {
        0
    }

    fn lookup(&self, _key: &K) -> Option<V> {
        None
    }

    fn store(&self, _key: K, value: V) -> V {
        value
    }
}
