//! Bounded least-recently-used cache shared across threads.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// `lru::LruCache` behind a mutex, for process-wide memo tables.
///
/// Lookups clone the value out so the lock is never held by callers.
#[derive(Debug)]
pub struct SharedLruCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> SharedLruCache<K, V> {
    /// Create a cache. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    /// Clone the cached value out, refreshing its recency.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or replace `key`. Returns the entry evicted to make room.
    pub fn insert(&self, key: K, value: V) -> Option<(K, V)> {
        let mut inner = self.inner.lock();
        if inner.contains(&key) {
            inner.put(key, value);
            return None;
        }
        inner.push(key, value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
