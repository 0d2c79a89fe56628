//! Token codec error types.

use thiserror::Error;

/// Token codec errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature does not verify, or the token uses an unexpected algorithm
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// Token is past its expiry
    #[error("Token is expired")]
    Expired,

    /// Any other structural failure
    #[error("Token is malformed: {0}")]
    Malformed(String),

    /// Signing failed
    #[error("Token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
