//! JSON envelope responses.
//!
//! Every endpoint answers with a [`CommonResponse`]. The compact
//! [`Outcome`] of the response is also stored in the response extensions so
//! the guard middlewares can run their post-checks without parsing the body.

use authguard::{
    outcome::{CommonResponse, ErrorCode, Outcome},
    security::GuardRejection,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Envelope plus the HTTP status it is sent with
#[derive(Debug)]
pub struct ApiResponse<T = serde_json::Value> {
    status: StatusCode,
    body: CommonResponse<T>,
}

impl<T> ApiResponse<T> {
    /// `200 OK` with `success: true`
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: CommonResponse::ok(data),
        }
    }
}

impl ApiResponse {
    /// Business failure, sent as `200 OK` with `success: false`
    pub fn fail(code: ErrorCode) -> Self {
        Self::fail_with(code, code.message())
    }

    pub fn fail_with(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: CommonResponse::fail(code, message),
        }
    }

    /// Request aborted before reaching the handler
    pub fn abort(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: CommonResponse::fail(code, message),
        }
    }

    /// Guard rejection with the status matching its code
    pub fn rejected(rejection: &GuardRejection) -> Self {
        Self {
            status: status_for(rejection.code),
            body: rejection.to_response(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let outcome = self.body.outcome();
        let mut response = (self.status, Json(self.body)).into_response();
        response.extensions_mut().insert(outcome);
        response
    }
}

/// HTTP status used when a request is rejected with `code` before the handler
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::RequestBlocked | ErrorCode::LoginReachLimit | ErrorCode::SessionExpired => {
            StatusCode::FORBIDDEN
        }
        ErrorCode::ParamError => StatusCode::BAD_REQUEST,
        ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    }
}

/// Outcome recorded on a response, if it went through [`ApiResponse`]
pub fn outcome_of(response: &Response) -> Option<Outcome> {
    response.extensions().get::<Outcome>().copied()
}
