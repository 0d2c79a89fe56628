//! Response envelope and the stable, user-visible error codes.
//!
//! Every rejection and every handler result is reported as a [`CommonResponse`]
//! carrying a success flag, a numeric [`ErrorCode`] and a human-readable message.
//! The compact [`Outcome`] form is what post-check guards inspect once the
//! handler has run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric error codes returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ErrorCode {
    Success,
    ServerError,
    ParamError,
    Unauthorized,
    TooManyRequests,
    LoginReachLimit,
    RequestBlocked,
    SessionExpired,
    /// Unknown account or wrong password. Both map to the same code so a
    /// client cannot probe which accounts exist.
    UserNotExist,
    UserStatusInvalid,
    UserNameDuplicated,
}

impl ErrorCode {
    /// Numeric code sent on the wire
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::ServerError => 1_0001,
            ErrorCode::ParamError => 1_0002,
            ErrorCode::Unauthorized => 1_0003,
            ErrorCode::TooManyRequests => 1_0004,
            ErrorCode::LoginReachLimit => 1_0005,
            ErrorCode::RequestBlocked => 1_0006,
            ErrorCode::SessionExpired => 1_0007,
            ErrorCode::UserNotExist => 2_0001,
            ErrorCode::UserStatusInvalid => 2_0002,
            ErrorCode::UserNameDuplicated => 2_0003,
        }
    }

    /// Default message for the code
    pub const fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::ServerError => "internal server error",
            ErrorCode::ParamError => "param error",
            ErrorCode::Unauthorized => "user unauthorized",
            ErrorCode::TooManyRequests => "too many request",
            ErrorCode::LoginReachLimit => "login reach limit",
            ErrorCode::RequestBlocked => "request is blocked",
            ErrorCode::SessionExpired => "session expired",
            ErrorCode::UserNotExist => "user not exist or password incorrect",
            ErrorCode::UserStatusInvalid => "user is invalid",
            ErrorCode::UserNameDuplicated => "user name duplicated",
        }
    }

    /// Whether a failed login with this code counts as a brute-force signal.
    ///
    /// Only account-related failures do; system errors never count.
    pub const fn is_credential_failure(self) -> bool {
        matches!(self, ErrorCode::UserNotExist)
    }

    pub fn from_code(code: i32) -> Option<Self> {
        [
            ErrorCode::Success,
            ErrorCode::ServerError,
            ErrorCode::ParamError,
            ErrorCode::Unauthorized,
            ErrorCode::TooManyRequests,
            ErrorCode::LoginReachLimit,
            ErrorCode::RequestBlocked,
            ErrorCode::SessionExpired,
            ErrorCode::UserNotExist,
            ErrorCode::UserStatusInvalid,
            ErrorCode::UserNameDuplicated,
        ]
        .into_iter()
        .find(|c| c.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code(), self.message())
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        ErrorCode::from_code(value).ok_or_else(|| format!("unknown error code {value}"))
    }
}

/// Result of a handler as seen by the post-check hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub code: ErrorCode,
}

impl Outcome {
    pub const fn success() -> Self {
        Self {
            success: true,
            code: ErrorCode::Success,
        }
    }

    pub const fn failure(code: ErrorCode) -> Self {
        Self {
            success: false,
            code,
        }
    }
}

/// JSON envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonResponse<T = serde_json::Value> {
    pub success: bool,
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> CommonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            code: ErrorCode::Success.code(),
            message: ErrorCode::Success.message().to_string(),
            data: Some(data),
        }
    }

    pub fn fail(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Compact outcome for post-check hooks.
    ///
    /// Unknown codes are reported as `ServerError` so they never count as a
    /// credential failure.
    pub fn outcome(&self) -> Outcome {
        if self.success {
            Outcome::success()
        } else {
            Outcome::failure(ErrorCode::from_code(self.code).unwrap_or(ErrorCode::ServerError))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::Unauthorized.code(), 10003);
        assert_eq!(ErrorCode::RequestBlocked.code(), 10006);
        assert_eq!(ErrorCode::SessionExpired.code(), 10007);
        assert_eq!(ErrorCode::UserNotExist.code(), 20001);
    }

    #[test]
    fn test_from_code_round_trips_known_codes() {
        assert_eq!(ErrorCode::from_code(10005), Some(ErrorCode::LoginReachLimit));
        assert_eq!(ErrorCode::from_code(99999), None);
    }

    #[test]
    fn test_envelope_outcome() {
        let ok = CommonResponse::ok(serde_json::json!({"user_id": "u1"}));
        assert_eq!(ok.outcome(), Outcome::success());

        let fail: CommonResponse = CommonResponse::fail(ErrorCode::UserNotExist, "nope");
        assert_eq!(fail.outcome(), Outcome::failure(ErrorCode::UserNotExist));

        let unknown: CommonResponse = CommonResponse {
            success: false,
            code: 42,
            message: String::new(),
            data: None,
        };
        assert_eq!(unknown.outcome(), Outcome::failure(ErrorCode::ServerError));
    }

    #[test]
    fn test_envelope_serialization_skips_empty_data() {
        let fail: CommonResponse = CommonResponse::fail(ErrorCode::TooManyRequests, "slow down");
        let json = serde_json::to_string(&fail).unwrap();
        assert!(!json.contains("data"));
        assert!(json.contains("10004"));
    }

    #[test]
    fn test_only_account_failures_are_credential_failures() {
        assert!(ErrorCode::UserNotExist.is_credential_failure());
        assert!(!ErrorCode::ServerError.is_credential_failure());
        assert!(!ErrorCode::ParamError.is_credential_failure());
    }
}
