//! Fixed-window request interceptor.
//!
//! Each key gets a counter under `rate_limit:<key>` whose window opens at the
//! first request and closes `window` later. Up to `limit` requests pass per
//! window. Because windows are anchored per key rather than aligned to the
//! clock, a client can burst up to twice the limit around a window edge.

use crate::store::{CounterStore, StoreResult};
use std::{sync::Arc, time::Duration};

/// Prefix shared by every rate counter
pub const KEY_PREFIX: &str = "rate_limit:";

/// Counter-backed admission check
#[derive(Clone)]
pub struct Interceptor {
    store: Arc<dyn CounterStore>,
    window: Duration,
    limit: u64,
}

impl Interceptor {
    /// Create a new interceptor
    ///
    /// # Arguments
    ///
    /// * `store` - Shared counter store
    /// * `window_secs` - Window length in seconds
    /// * `limit` - Requests admitted per window
    pub fn new(store: Arc<dyn CounterStore>, window_secs: u64, limit: u64) -> Self {
        Self {
            store,
            window: Duration::from_secs(window_secs),
            limit,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    /// Count one request against `key` and report whether it is admitted.
    ///
    /// # Errors
    ///
    /// Store failures are returned to the caller, which decides whether to
    /// fail open.
    pub async fn allow(&self, key: &str) -> StoreResult<bool> {
        let current = self.store.incr_window(&Self::key(key), self.window).await?;
        Ok(current <= self.limit as i64)
    }

    /// Whether `key` has already used up its window, without counting.
    ///
    /// Store failures and unreadable values report `false`.
    pub async fn reach_limit(&self, key: &str) -> bool {
        match self.count(key).await {
            Ok(current) => current >= self.limit as i64,
            Err(e) => {
                log::warn!("Rate limit peek failed for {}: {}", key, e);
                false
            }
        }
    }

    /// Current counter value, 0 when absent
    pub async fn count(&self, key: &str) -> StoreResult<i64> {
        let full_key = Self::key(key);
        match self.store.get(&full_key).await? {
            None => Ok(0),
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| crate::store::StoreError::Corrupt {
                    key: full_key,
                    value,
                }),
        }
    }
}
