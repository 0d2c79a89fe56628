//! Account storage behind a trait for testability and dependency injection.

#![allow(clippy::needless_raw_string_hashes)]

use super::{
    errors::{CredentialError, CredentialResult},
    models::{Credential, User},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Trait for account and credential storage
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Find user by login account
    async fn find_by_account(&self, account: &str) -> CredentialResult<Option<User>>;

    /// Find user by ID
    async fn find_by_user_id(&self, user_id: &str) -> CredentialResult<Option<User>>;

    /// Find the credential of a user
    async fn find_credential(&self, user_id: &str) -> CredentialResult<Option<Credential>>;

    /// Create a user together with its credential, atomically.
    ///
    /// # Errors
    ///
    /// * `CredentialError::UserNameDuplicated` - Account already taken
    async fn create_user(&self, user: &User, credential: &Credential) -> CredentialResult<()>;

    /// Replace a credential if its stored version still equals `expected_version`.
    ///
    /// Returns `false` when the version moved or the credential is gone.
    async fn update_credential(
        &self,
        expected_version: i64,
        credential: &Credential,
    ) -> CredentialResult<bool>;

    /// Change the display name, returning `false` for an unknown user
    async fn update_name(&self, user_id: &str, name: &str) -> CredentialResult<bool>;
}

/// PostgreSQL implementation of `CredentialRepository`
#[derive(Clone)]
pub struct PgCredentialRepository {
    pool: Arc<PgPool>,
}

impl PgCredentialRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create the account tables when they do not exist yet
    pub async fn ensure_schema(&self) -> CredentialResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id    TEXT PRIMARY KEY,
                account    TEXT NOT NULL UNIQUE,
                name       TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_credentials (
                user_id            TEXT PRIMARY KEY REFERENCES users (user_id) ON DELETE CASCADE,
                password_salt      TEXT NOT NULL,
                password_hash      TEXT NOT NULL,
                credential_version BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

fn user_from_row(r: &PgRow) -> User {
    User {
        user_id: r.get("user_id"),
        account: r.get("account"),
        name: r.get("name"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn find_by_account(&self, account: &str) -> CredentialResult<Option<User>> {
        let row = sqlx::query(
            "SELECT user_id, account, name, created_at, updated_at FROM users WHERE account = $1",
        )
        .bind(account)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_user_id(&self, user_id: &str) -> CredentialResult<Option<User>> {
        let row = sqlx::query(
            "SELECT user_id, account, name, created_at, updated_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_credential(&self, user_id: &str) -> CredentialResult<Option<Credential>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, password_salt, password_hash, credential_version
            FROM user_credentials WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| Credential {
            user_id: r.get("user_id"),
            password_salt: r.get("password_salt"),
            password_hash: r.get("password_hash"),
            credential_version: r.get("credential_version"),
        }))
    }

    async fn create_user(&self, user: &User, credential: &Credential) -> CredentialResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (user_id, account, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.account)
        .bind(&user.name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(CredentialError::UserNameDuplicated);
            }
            return Err(e.into());
        }

        sqlx::query(
            r#"
            INSERT INTO user_credentials (user_id, password_salt, password_hash, credential_version)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&credential.user_id)
        .bind(&credential.password_salt)
        .bind(&credential.password_hash)
        .bind(credential.credential_version)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_credential(
        &self,
        expected_version: i64,
        credential: &Credential,
    ) -> CredentialResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_credentials
            SET password_salt = $2, password_hash = $3, credential_version = $4
            WHERE user_id = $1 AND credential_version = $5
            "#,
        )
        .bind(&credential.user_id)
        .bind(&credential.password_salt)
        .bind(&credential.password_hash)
        .bind(credential.credential_version)
        .bind(expected_version)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_name(&self, user_id: &str, name: &str) -> CredentialResult<bool> {
        let result = sqlx::query("UPDATE users SET name = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(name)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Default)]
struct Accounts {
    users: HashMap<String, User>,
    credentials: HashMap<String, Credential>,
    by_account: HashMap<String, String>,
}

/// In-memory `CredentialRepository` for development and tests
#[derive(Debug, Default)]
pub struct MemoryCredentialRepository {
    accounts: RwLock<Accounts>,
}

impl MemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a credential while keeping its user, producing the inconsistent
    /// state a partially failed migration could leave behind
    pub async fn remove_credential(&self, user_id: &str) {
        self.accounts.write().await.credentials.remove(user_id);
    }
}

#[async_trait]
impl CredentialRepository for MemoryCredentialRepository {
    async fn find_by_account(&self, account: &str) -> CredentialResult<Option<User>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .by_account
            .get(account)
            .and_then(|id| accounts.users.get(id))
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> CredentialResult<Option<User>> {
        Ok(self.accounts.read().await.users.get(user_id).cloned())
    }

    async fn find_credential(&self, user_id: &str) -> CredentialResult<Option<Credential>> {
        Ok(self.accounts.read().await.credentials.get(user_id).cloned())
    }

    async fn create_user(&self, user: &User, credential: &Credential) -> CredentialResult<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.by_account.contains_key(&user.account) {
            return Err(CredentialError::UserNameDuplicated);
        }

        accounts
            .by_account
            .insert(user.account.clone(), user.user_id.clone());
        accounts.users.insert(user.user_id.clone(), user.clone());
        accounts
            .credentials
            .insert(credential.user_id.clone(), credential.clone());
        Ok(())
    }

    async fn update_credential(
        &self,
        expected_version: i64,
        credential: &Credential,
    ) -> CredentialResult<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.credentials.get_mut(&credential.user_id) {
            Some(stored) if stored.credential_version == expected_version => {
                *stored = credential.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_name(&self, user_id: &str, name: &str) -> CredentialResult<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.users.get_mut(user_id) {
            Some(user) => {
                user.name = name.to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, account: &str) -> (User, Credential) {
        let now = Utc::now();
        (
            User {
                user_id: id.to_string(),
                account: account.to_string(),
                name: "Name".to_string(),
                created_at: now,
                updated_at: now,
            },
            Credential {
                user_id: id.to_string(),
                password_salt: "salt".to_string(),
                password_hash: "hash".to_string(),
                credential_version: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_memory_create_and_find() {
        let repo = MemoryCredentialRepository::new();
        let (u, c) = user("u1", "alice");
        repo.create_user(&u, &c).await.unwrap();

        assert_eq!(repo.find_by_account("alice").await.unwrap(), Some(u.clone()));
        assert_eq!(repo.find_by_user_id("u1").await.unwrap(), Some(u));
        assert_eq!(repo.find_credential("u1").await.unwrap(), Some(c));
        assert!(repo.find_by_account("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_duplicate_account() {
        let repo = MemoryCredentialRepository::new();
        let (u, c) = user("u1", "alice");
        repo.create_user(&u, &c).await.unwrap();

        let (u2, c2) = user("u2", "alice");
        let err = repo.create_user(&u2, &c2).await.unwrap_err();
        assert!(matches!(err, CredentialError::UserNameDuplicated));
        assert!(repo.find_by_user_id("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_update_credential_checks_version() {
        let repo = MemoryCredentialRepository::new();
        let (u, c) = user("u1", "alice");
        repo.create_user(&u, &c).await.unwrap();

        let next = Credential {
            credential_version: 1,
            ..c.clone()
        };
        assert!(repo.update_credential(0, &next).await.unwrap());
        // Stale writer loses
        assert!(!repo.update_credential(0, &next).await.unwrap());
        assert_eq!(
            repo.find_credential("u1").await.unwrap().unwrap().credential_version,
            1
        );
    }

    #[tokio::test]
    async fn test_memory_update_name() {
        let repo = MemoryCredentialRepository::new();
        let (u, c) = user("u1", "alice");
        repo.create_user(&u, &c).await.unwrap();

        assert!(repo.update_name("u1", "Alice").await.unwrap());
        assert!(!repo.update_name("missing", "x").await.unwrap());
        assert_eq!(repo.find_by_user_id("u1").await.unwrap().unwrap().name, "Alice");
    }
}
