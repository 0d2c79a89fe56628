//! Account and credential records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    /// Unique login name
    pub account: String,
    /// Display name
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Secret material for one account.
///
/// `credential_version` increases by one on every password change; sessions
/// remember the version they were created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: String,
    pub password_salt: String,
    pub password_hash: String,
    pub credential_version: i64,
}
