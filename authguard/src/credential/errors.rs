//! Credential error types.

use crate::{digest::DigestError, outcome::ErrorCode};
use thiserror::Error;

/// Account and credential errors
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error(transparent)]
    Hashing(#[from] DigestError),

    /// No account with that identifier
    #[error("User does not exist")]
    UserNotExist,

    /// Password did not match
    #[error("Password incorrect")]
    PasswordIncorrect,

    /// Account name already taken
    #[error("User name already exists")]
    UserNameDuplicated,

    /// Account exists without a credential row
    #[error("Inconsistent account state: {0}")]
    Inconsistent(String),

    /// Credential changed between read and write
    #[error("Credential was changed concurrently")]
    VersionConflict,
}

impl CredentialError {
    /// Client-facing code. Unknown accounts and wrong passwords share one code.
    pub fn code(&self) -> ErrorCode {
        match self {
            CredentialError::UserNotExist | CredentialError::PasswordIncorrect => {
                ErrorCode::UserNotExist
            }
            CredentialError::UserNameDuplicated => ErrorCode::UserNameDuplicated,
            CredentialError::VersionConflict => ErrorCode::SessionExpired,
            CredentialError::Database(_)
            | CredentialError::Hashing(_)
            | CredentialError::Inconsistent(_) => ErrorCode::ServerError,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        self.code().message().to_string()
    }
}

/// Result type for credential operations
pub type CredentialResult<T> = Result<T, CredentialError>;
