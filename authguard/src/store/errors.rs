//! Store error types.

use thiserror::Error;

/// Counter store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A counter key holds something that is not an integer
    #[error("Value under {key} is not a counter: {value}")]
    Corrupt { key: String, value: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
