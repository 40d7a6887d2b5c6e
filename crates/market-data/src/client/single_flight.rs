//! Per-key locks so only one upstream fetch per cache key is in flight.
//!
//! Locks are created lazily on first use and pruned once nobody holds or
//! waits on them.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<K, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(|poisoned| {
            warn!("Single-flight lock map was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Wait for exclusive ownership of `key`.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.lock_map();
            // Only the map itself references an idle lock
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys with a holder or waiter.
    pub fn in_flight(&self) -> usize {
        self.lock_map()
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks: KeyedLocks<&'static str> = KeyedLocks::new();

        let guard = locks.lock(&"AAPL").await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.lock(&"AAPL")).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(20), locks.lock(&"AAPL")).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks: KeyedLocks<&'static str> = KeyedLocks::new();

        let _aapl = locks.lock(&"AAPL").await;
        let msft = tokio::time::timeout(Duration::from_millis(20), locks.lock(&"MSFT")).await;
        assert!(msft.is_ok());
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let locks: KeyedLocks<String> = KeyedLocks::new();

        let guard = locks.lock(&"AAPL".to_string()).await;
        assert_eq!(locks.in_flight(), 1);
        drop(guard);
        assert_eq!(locks.in_flight(), 0);

        let _other = locks.lock(&"MSFT".to_string()).await;
        assert_eq!(locks.lock_map().len(), 1);
    }
}
