//! Error types for the security guards

use crate::outcome::{CommonResponse, ErrorCode};
use thiserror::Error;

/// A guard refused the request.
///
/// Carries the client-facing code and message; the server maps the code to
/// an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GuardRejection {
    pub code: ErrorCode,
    pub message: String,
}

impl GuardRejection {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Rejection using the code's default message
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.message())
    }

    pub fn to_response(&self) -> CommonResponse {
        CommonResponse::fail(self.code, self.message.clone())
    }
}

/// Result type for guard checks
pub type GuardResult = Result<(), GuardRejection>;
