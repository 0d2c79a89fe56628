//! In-process counter store.
//!
//! Expiry is lazy: expired entries are treated as absent on access and
//! dropped by [`MemoryCounterStore::purge_expired`]. Time is read from
//! `tokio::time::Instant`, so tests can pause and advance the clock.

use super::{CounterStore, KeyTtl, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Counter store backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value without any expiry.
    ///
    /// Only useful to reproduce orphaned keys; nothing in the crate writes
    /// persistent keys.
    pub async fn insert_persistent(&self, key: &str, value: &str) {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .get(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(match entries.get(key) {
            Some(entry) if entry.is_live(now) => match entry.expires_at {
                Some(at) => KeyTtl::Expires(at - now),
                None => KeyTtl::Persistent,
            },
            _ => KeyTtl::Missing,
        })
    }

    async fn incr_window(&self, key: &str, window: Duration) -> StoreResult<i64> {
        let now = Instant::now();
        // The whole read-modify-write runs under one lock acquisition.
        let mut entries = self.entries.lock().await;

        let previous = match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                let current = entry.value.parse::<i64>().map_err(|_| StoreError::Corrupt {
                    key: key.to_string(),
                    value: entry.value.clone(),
                })?;
                Some((current, entry.expires_at))
            }
            _ => None,
        };

        let (value, expires_at) = match previous {
            None => (1, Some(now + window)),
            Some((current, None)) => (current + 1, Some(now + window)),
            Some((current, expires_at)) => (current + 1, expires_at),
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_get_and_expiry() {
        tokio::time::pause();
        let store = MemoryCounterStore::new();

        store.set("k", "v", Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.exists("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_del_reports_presence() {
        let store = MemoryCounterStore::new();
        store.set("k", "1", WINDOW).await.unwrap();

        assert!(store.del("k").await.unwrap());
        assert!(!store.del("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_only_touches_live_keys() {
        tokio::time::pause();
        let store = MemoryCounterStore::new();

        assert!(!store.expire("missing", WINDOW).await.unwrap());

        store.set("k", "1", Duration::from_secs(100)).await.unwrap();
        assert!(store.expire("k", Duration::from_secs(10)).await.unwrap());
        assert_eq!(
            store.ttl("k").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(10))
        );
    }

    #[tokio::test]
    async fn test_incr_window_anchors_ttl_at_first_increment() {
        tokio::time::pause();
        let store = MemoryCounterStore::new();

        assert_eq!(store.incr_window("c", WINDOW).await.unwrap(), 1);
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(store.incr_window("c", WINDOW).await.unwrap(), 2);

        // Second increment must not extend the window
        assert_eq!(
            store.ttl("c").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(40))
        );

        tokio::time::advance(Duration::from_secs(41)).await;
        assert_eq!(store.incr_window("c", WINDOW).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_window_heals_orphaned_key() {
        tokio::time::pause();
        let store = MemoryCounterStore::new();
        store.insert_persistent("c", "7").await;
        assert_eq!(store.ttl("c").await.unwrap(), KeyTtl::Persistent);

        assert_eq!(store.incr_window("c", WINDOW).await.unwrap(), 8);
        assert_eq!(store.ttl("c").await.unwrap(), KeyTtl::Expires(WINDOW));
    }

    #[tokio::test]
    async fn test_incr_window_rejects_non_counter() {
        let store = MemoryCounterStore::new();
        store.set("c", "not-a-number", WINDOW).await.unwrap();

        let err = store.incr_window("c", WINDOW).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryCounterStore::new());
        let mut join_set = JoinSet::new();

        for _ in 0..100 {
            let store = Arc::clone(&store);
            join_set.spawn(async move { store.incr_window("c", WINDOW).await.unwrap() });
        }

        let mut seen = Vec::new();
        while let Some(result) = join_set.join_next().await {
            seen.push(result.unwrap());
        }
        seen.sort_unstable();

        // Every caller observed a distinct value, exactly one saw 1
        assert_eq!(seen, (1..=100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        tokio::time::pause();
        let store = MemoryCounterStore::new();
        store.set("short", "1", Duration::from_secs(1)).await.unwrap();
        store.set("long", "1", Duration::from_secs(100)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }
}
