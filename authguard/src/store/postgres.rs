//! PostgreSQL-backed counter store.
//!
//! Every key lives in one row of `kv_store`. Rows whose `expires_at` lies in
//! the past are treated as absent and are recycled by the next write, so
//! expiry stays passive; [`PgCounterStore::purge_expired`] only reclaims space.

#![allow(clippy::needless_raw_string_hashes)]

use super::{CounterStore, KeyTtl, StoreError, StoreResult};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::{sync::Arc, time::Duration};

/// Counter store shared by all service instances through PostgreSQL
#[derive(Clone)]
pub struct PgCounterStore {
    pool: Arc<PgPool>,
}

impl PgCounterStore {
    /// Create a new store on top of an existing pool
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create the backing table when it does not exist yet
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at TIMESTAMPTZ NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS kv_store_expires_at_idx ON kv_store (expires_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    /// Delete expired rows
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM kv_store WHERE expires_at IS NOT NULL AND expires_at <= NOW()",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}

fn secs(ttl: Duration) -> f64 {
    ttl.as_secs_f64()
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT value FROM kv_store
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
            ON CONFLICT (key)
            DO UPDATE SET
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(secs(ttl))
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM kv_store
                WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            ) AS present
            "#,
        )
        .bind(key)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.get("present"))
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let row = sqlx::query(
            r#"
            DELETE FROM kv_store WHERE key = $1
            RETURNING (expires_at IS NULL OR expires_at > NOW()) AS was_live
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.is_some_and(|r| r.get::<bool, _>("was_live")))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE kv_store SET expires_at = NOW() + make_interval(secs => $2)
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .bind(secs(ttl))
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let row = sqlx::query(
            r#"
            SELECT EXTRACT(EPOCH FROM (expires_at - NOW()))::DOUBLE PRECISION AS remaining
            FROM kv_store
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(match row {
            None => KeyTtl::Missing,
            Some(row) => match row.get::<Option<f64>, _>("remaining") {
                None => KeyTtl::Persistent,
                Some(remaining) => KeyTtl::Expires(Duration::from_secs_f64(remaining.max(0.0))),
            },
        })
    }

    async fn incr_window(&self, key: &str, window: Duration) -> StoreResult<i64> {
        // One statement: the row lock taken by the upsert serialises concurrent
        // increments of the same key, so no two callers can both observe 1.
        let row = sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, expires_at)
            VALUES ($1, '1', NOW() + make_interval(secs => $2))
            ON CONFLICT (key)
            DO UPDATE SET
                value = CASE
                    WHEN kv_store.expires_at IS NOT NULL AND kv_store.expires_at <= NOW() THEN '1'
                    ELSE (kv_store.value::BIGINT + 1)::TEXT
                END,
                expires_at = CASE
                    WHEN kv_store.expires_at IS NULL THEN EXCLUDED.expires_at
                    WHEN kv_store.expires_at <= NOW() THEN EXCLUDED.expires_at
                    ELSE kv_store.expires_at
                END
            RETURNING value
            "#,
        )
        .bind(key)
        .bind(secs(window))
        .fetch_one(self.pool.as_ref())
        .await?;

        let value: String = row.get("value");
        value.parse::<i64>().map_err(|_| StoreError::Corrupt {
            key: key.to_string(),
            value,
        })
    }
}
