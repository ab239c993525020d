use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Thread-safe LRU cache with a per-entry time-to-live.
///
/// Uses the Arc<Mutex<>> pattern for safe concurrent access across requests;
/// clones share the underlying cache. Expired entries are treated as misses
/// and evicted on read, so readers never see stale data past the TTL.
pub struct TtlCache<K: Hash + Eq, V: Clone> {
    cache: Arc<Mutex<LruCache<K, (V, Instant)>>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            ttl: self.ttl,
        }
    }
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    /// # Panics
    /// Panics if capacity is 0.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cache = LruCache::new(NonZeroUsize::new(capacity).expect("Capacity must be non-zero"));
        Self {
            cache: Arc::new(Mutex::new(cache)),
            ttl,
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(key) {
            Some((_, inserted_at)) if inserted_at.elapsed() >= self.ttl => {
                cache.pop(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let mut cache = self.cache.lock().unwrap();
        cache.put(key, (value, Instant::now()));
    }

    pub fn invalidate<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.cache.lock().unwrap();
        cache.pop(key);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
