//! TTL caches for resolved snapshots.
//!
//! Resolution hits upstream stores, so each snapshot kind is cached behind a
//! bounded TTL map. Expiry is lazy: entries are checked on read and swept on
//! insert when the map is full. Expired entries go first; if none are
//! expired, the oldest entry by insertion time is evicted.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

// ============================================================================
// TtlCache
// ============================================================================

struct Entry<V> {
    value: V,
    created: Instant,
    expires: Instant,
}

/// Counters for one cache, reported through resolver stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that returned a live entry.
    pub hits: u64,
    /// Reads that found nothing, or only an expired entry.
    pub misses: u64,
    /// Entries currently stored (live or not yet swept).
    pub entries: usize,
}

/// Bounded map with per-entry TTL and interior mutability.
pub struct TtlCache<K, V> {
    inner: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
    max_entries: usize,
    hits: RwLock<u64>,
    misses: RwLock<u64>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Creates a cache with the given TTL and capacity.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            hits: RwLock::new(0),
            misses: RwLock::new(0),
        }
    }

    /// Returns a clone of the live entry for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let found = {
            let map = self
                .inner
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            map.get(key)
                .filter(|entry| entry.expires > now)
                .map(|entry| entry.value.clone())
        };
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        *counter
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) += 1;
        found
    }

    /// Inserts `value` under `key`, evicting if the cache is at capacity.
    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut map = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if map.len() >= self.max_entries && !map.contains_key(&key) {
            map.retain(|_, entry| entry.expires > now);
            if map.len() >= self.max_entries {
                if let Some(oldest) = map
                    .iter()
                    .min_by_key(|(_, entry)| entry.created)
                    .map(|(k, _)| k.clone())
                {
                    map.remove(&oldest);
                }
            }
        }

        map.insert(
            key,
            Entry {
                value,
                created: now,
                expires: now + self.ttl,
            },
        );
    }

    /// Removes a single entry.
    pub fn invalidate(&self, key: &K) {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// Hit/miss counters and current size.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: *self
                .hits
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            misses: *self
                .misses
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            entries: self
                .inner
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len(),
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
