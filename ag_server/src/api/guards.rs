//! Guard middlewares around the user endpoints.
//!
//! Each middleware runs its guard's pre-check, lets the request through on
//! success, then hands the handler's [`Outcome`](authguard::Outcome) to the
//! guard's post-check. Rejections answer with the guard's envelope and
//! never reach the handler.

use super::{
    AppState,
    dto::{LoginReq, Validate},
    extract::{ClientIp, param_error},
    response::{ApiResponse, outcome_of},
    session::CurrentSession,
};
use crate::{logging::log_security_event, metrics};
use authguard::{
    outcome::ErrorCode,
    security::{FailureVerdict, GuardRejection},
};
use axum::{
    body::Body,
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Largest login body buffered to read the account
const MAX_LOGIN_BODY_BYTES: usize = 16 * 1024;

fn reject(guard: &'static str, reason: &'static str, rejection: &GuardRejection) -> Response {
    metrics::guard_rejections_total(guard, reason);
    ApiResponse::rejected(rejection).into_response()
}

/// Per-path fixed-window rate limit, keyed on the client IP or the session
pub async fn path_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let ip = ClientIp::from_request(&request);
    let session = request
        .extensions()
        .get::<CurrentSession>()
        .and_then(|s| s.id.clone());

    if let Err(rejection) = state
        .path_limiter
        .check(&path, ip.as_str(), session.as_deref())
        .await
    {
        tracing::info!("Rate limited {} for {}", path, ip.as_str());
        return reject("path_limit", "too_many_requests", &rejection);
    }

    next.run(request).await
}

/// Escalating per-IP block after failed logins
pub async fn login_protection_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = ClientIp::from_request(&request);

    if let Err(rejection) = state.login_guard.pre_check(ip.as_str()).await {
        log_security_event("login_blocked", ip.as_str(), None, &rejection.message);
        return reject("login_protection", "blocked", &rejection);
    }

    let response = next.run(request).await;

    let Some(outcome) = outcome_of(&response) else {
        return response;
    };
    match state.login_guard.post_check(ip.as_str(), outcome).await {
        FailureVerdict::BlockedMinutes => log_security_event(
            "login_block_minutes",
            ip.as_str(),
            None,
            "Too many login failures, minute block applied",
        ),
        FailureVerdict::BlockedHours => log_security_event(
            "login_block_hours",
            ip.as_str(),
            None,
            "Repeated login failures, hour block applied",
        ),
        FailureVerdict::Ignored | FailureVerdict::Counted => {}
    }

    response
}

/// Per-account cap on successful logins.
///
/// The account is read from the login body, which is buffered and handed on
/// unchanged to the handler.
pub async fn login_success_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = ClientIp::from_request(&request);
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_LOGIN_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return param_error(e.to_string()).into_response(),
    };
    let account = match serde_json::from_slice::<LoginReq>(&bytes) {
        Ok(req) => match req.validate() {
            Ok(()) => req.account,
            Err(message) => return param_error(message).into_response(),
        },
        Err(e) => return param_error(e.to_string()).into_response(),
    };

    if let Err(rejection) = state.success_throttle.pre_check(&account).await {
        log_security_event(
            "login_success_limit",
            ip.as_str(),
            Some(&account),
            &rejection.message,
        );
        return reject("login_success", "limit_reached", &rejection);
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    if let Some(outcome) = outcome_of(&response) {
        state.success_throttle.post_check(&account, outcome).await;
    }

    response
}

/// Per-IP cooldown after a successful registration
pub async fn register_protection_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = ClientIp::from_request(&request);

    if let Err(rejection) = state.register_guard.pre_check(ip.as_str()).await {
        log_security_event("register_blocked", ip.as_str(), None, &rejection.message);
        return reject("register_protection", "blocked", &rejection);
    }

    let response = next.run(request).await;

    if let Some(outcome) = outcome_of(&response) {
        state.register_guard.post_check(ip.as_str(), outcome).await;
    }

    response
}

/// Rejects sessions whose credential version is older than the account's
pub async fn credential_gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session = request
        .extensions()
        .get::<CurrentSession>()
        .cloned()
        .unwrap_or_default();

    if let Err(rejection) = state.credential_gate.check(session.data()).await {
        let reason = match rejection.code {
            ErrorCode::Unauthorized => "no_session",
            ErrorCode::SessionExpired => {
                let ip = ClientIp::from_request(&request);
                log_security_event(
                    "credential_changed",
                    ip.as_str(),
                    session.data().map(|d| d.account.as_str()),
                    &rejection.message,
                );
                "session_expired"
            }
            _ => "lookup_failed",
        };
        return reject("credential_gate", reason, &rejection);
    }

    next.run(request).await
}
