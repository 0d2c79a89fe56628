//! Authentication error types.

use crate::{outcome::ErrorCode, store::StoreError, token::TokenError};
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token missing, forged, expired, revoked or bound to another session
    #[error("Unauthorized")]
    Unauthorized,

    /// Refresh token unusable for rotation
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Session not found
    #[error("Session not found")]
    SessionNotFound,

    /// Token codec error
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::Unauthorized | AuthError::InvalidRefreshToken | AuthError::SessionNotFound => {
                ErrorCode::Unauthorized
            }
            AuthError::Token(_) => ErrorCode::Unauthorized,
            AuthError::Store(_) | AuthError::Serialization(_) => ErrorCode::ServerError,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Store and token errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Serialization(_) => "Internal server error".to_string(),
            AuthError::Token(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_is_sanitized() {
        let err = AuthError::Store(StoreError::Corrupt {
            key: "jwt_id_exist:abc".to_string(),
            value: "x".to_string(),
        });
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(err.code(), ErrorCode::ServerError);

        let err = AuthError::Token(TokenError::Malformed("bad base64 in header".to_string()));
        assert_eq!(err.client_message(), "Authentication failed");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}
