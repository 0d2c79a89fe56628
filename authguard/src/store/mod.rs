//! Shared counter/session store.
//!
//! All cross-request coordination goes through a [`CounterStore`]: a small
//! key-value surface with per-key TTLs plus one atomic operation,
//! [`CounterStore::incr_window`], that increments a counter and anchors or
//! repairs its expiry in a single step.
//!
//! Two backends are provided:
//! - [`MemoryCounterStore`]: single-process store for development and tests
//! - [`PgCounterStore`]: PostgreSQL-backed store shared by every instance
//!
//! ## Example
//!
//! ```
//! use authguard::store::{CounterStore, MemoryCounterStore};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), authguard::store::StoreError> {
//! let store = MemoryCounterStore::new();
//! assert_eq!(store.incr_window("rate_limit:1.2.3.4", Duration::from_secs(60)).await?, 1);
//! assert_eq!(store.incr_window("rate_limit:1.2.3.4", Duration::from_secs(60)).await?, 2);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::time::Duration;

pub mod errors;
pub mod memory;
pub mod postgres;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryCounterStore;
pub use postgres::PgCounterStore;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist (or already expired)
    Missing,
    /// Key exists without an expiry
    Persistent,
    /// Key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    pub fn remaining(self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(d),
            _ => None,
        }
    }
}

/// Key-value operations the guards and the token lifecycle rely on.
///
/// Apart from [`incr_window`](CounterStore::incr_window) the operations are
/// independent; callers never assume atomicity across two calls.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read a live value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value that expires after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Whether a live value exists
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Delete a key, returning whether it existed
    async fn del(&self, key: &str) -> StoreResult<bool>;

    /// Reset the expiry of an existing key, returning false if it is absent
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Remaining lifetime of a key
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// Atomically increment the counter under `key` and return the new value.
    ///
    /// When the new value is 1 the key expires after `window`. When it is
    /// greater than 1 but the key carries no expiry (an orphaned key left by a
    /// crashed writer or an out-of-band write), the expiry is set to `window`
    /// as well. Otherwise the existing expiry is kept, so the window stays
    /// anchored at the first increment.
    async fn incr_window(&self, key: &str, window: Duration) -> StoreResult<i64>;
}
