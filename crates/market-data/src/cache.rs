//! Time-to-live response cache.
//!
//! Entries are replaced wholesale on refresh and never mutated in place.
//! A stale entry is not evicted on read; it stays until the next successful
//! fetch for the same key overwrites it, so a failed refresh leaves the
//! previous value untouched.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::warn;
use tokio::time::Instant;

/// A cached value and the moment it was stored.
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: Arc<V>,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Servable iff `now - stored_at < ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            stored_at: self.stored_at,
        }
    }
}

/// Thread-safe map from key to [`CacheEntry`] with a single TTL.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Lock the entries for reading, recovering from poison if necessary.
    ///
    /// Every write replaces a whole entry, so a poisoned map is still consistent.
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Return the value for `key` if it is still fresh at `now`.
    pub fn get(&self, key: &K, now: Instant) -> Option<Arc<V>> {
        self.read_entries()
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Return the entry for `key` regardless of age.
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        self.read_entries().get(key).cloned()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: K, value: Arc<V>, now: Instant) {
        self.write_entries().insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }
}
