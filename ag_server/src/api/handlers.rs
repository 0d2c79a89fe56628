//! User endpoint handlers.
//!
//! Business failures (unknown account, duplicate account, invalid refresh
//! token...) are answered with `200 OK` and `success: false`; only malformed
//! bodies and guard rejections change the HTTP status.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/user/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"account": "alice", "name": "Alice", "password": "s3cret"}'
//! ```
//!
//! Login (stores the session and refresh cookies):
//! ```bash
//! curl -c jar -X POST http://localhost:8080/api/v1/user/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"account": "alice", "password": "s3cret"}'
//! ```

use super::{
    AppState, cookies,
    dto::{
        Empty, GetUserInfoResp, LoginReq, LoginResp, RefreshTokenResp, RegisterReq, RegisterResp,
        UpdateInfoReq, UpdatePasswordReq,
    },
    extract::ValidJson,
    response::ApiResponse,
    session::CurrentSession,
};
use crate::metrics;
use authguard::{
    auth::{AuthError, RequestContext, SessionData},
    credential::CredentialError,
    outcome::ErrorCode,
    token::IssuedToken,
};
use axum::{
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
};
use chrono::Utc;
use std::{fmt::Display, time::Duration};

type HandlerResult<T> = Result<T, ApiResponse>;

fn credential_failure(e: CredentialError) -> ApiResponse {
    let code = e.code();
    if code == ErrorCode::ServerError {
        tracing::error!("Account operation failed: {}", e);
    }
    ApiResponse::fail_with(code, e.client_message())
}

fn server_failure(context: &str, e: impl Display) -> ApiResponse {
    tracing::error!("{}: {}", context, e);
    ApiResponse::fail(ErrorCode::ServerError)
}

fn unauthorized(reason: &str) -> ApiResponse {
    tracing::info!("{}", reason);
    ApiResponse::fail(ErrorCode::Unauthorized)
}

/// Time until `token` expires, zero if already past
fn remaining(token: &IssuedToken) -> Duration {
    (token.expires_at - Utc::now()).to_std().unwrap_or_default()
}

fn append_cookie(
    headers: &mut HeaderMap,
    cookie: Result<HeaderValue, axum::http::header::InvalidHeaderValue>,
) -> HandlerResult<()> {
    let cookie = cookie.map_err(|e| server_failure("Failed to build cookie", e))?;
    headers.append(SET_COOKIE, cookie);
    Ok(())
}

/// Issue an access token and a refresh token for `sess_id`.
///
/// The refresh token is set as a cookie on `headers`.
async fn issue_token_pair(
    state: &AppState,
    user_id: &str,
    account: &str,
    sess_id: &str,
    headers: &mut HeaderMap,
) -> HandlerResult<(IssuedToken, IssuedToken)> {
    let access = state
        .tokens
        .issue_access_token(user_id, account, sess_id)
        .await
        .map_err(|e| server_failure("Failed to issue access token", e))?;
    metrics::tokens_issued_total("access");

    let refresh = state
        .tokens
        .issue_refresh_token(sess_id)
        .await
        .map_err(|e| server_failure("Failed to issue refresh token", e))?;
    metrics::tokens_issued_total("refresh");

    append_cookie(
        headers,
        cookies::refresh_cookie(state.sessions.config(), &refresh.token, remaining(&refresh)),
    )?;
    Ok((access, refresh))
}

/// Register a new account.
///
/// # Response
///
/// ```json
/// {"success": true, "code": 0, "message": "success", "data": {"user_id": "..."}}
/// ```
///
/// # Errors
///
/// - `UserNameDuplicated` envelope when the account is taken
/// - `400 Bad Request` with `ParamError` for missing or oversized fields
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterReq>,
) -> HandlerResult<ApiResponse<RegisterResp>> {
    let user = state
        .accounts
        .register(&req.account, &req.name, &req.password)
        .await
        .map_err(credential_failure)?;

    tracing::info!("Registered account {} as {}", user.account, user.user_id);
    Ok(ApiResponse::ok(RegisterResp {
        user_id: user.user_id,
    }))
}

/// Log in with account and password.
///
/// Creates a fresh session (replacing the one the client presented, if
/// any), returns an access token bound to it and sets the session and
/// refresh-token cookies.
pub async fn login(
    State(state): State<AppState>,
    session: CurrentSession,
    ValidJson(req): ValidJson<LoginReq>,
) -> HandlerResult<(HeaderMap, ApiResponse<LoginResp>)> {
    let (user, credential_version) = state
        .accounts
        .login(&req.account, &req.password)
        .await
        .map_err(|e| {
            metrics::login_total("failure");
            credential_failure(e)
        })?;
    metrics::login_total("success");

    if let Some(previous) = &session.id {
        if let Err(e) = state.sessions.remove(previous).await {
            tracing::warn!("Failed to remove previous session: {}", e);
        }
    }

    let sess_id = state
        .sessions
        .create(&SessionData {
            user_id: user.user_id.clone(),
            account: user.account.clone(),
            name: user.name.clone(),
            credential_version,
        })
        .await
        .map_err(|e| server_failure("Failed to save session", e))?;

    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        cookies::session_cookie(state.sessions.config(), &sess_id),
    )?;
    let (access, _refresh) =
        issue_token_pair(&state, &user.user_id, &user.account, &sess_id, &mut headers).await?;

    Ok((
        headers,
        ApiResponse::ok(LoginResp {
            access_token: access.token,
            expires_at: access.expires_at.timestamp(),
        }),
    ))
}

/// Rotate the refresh token and issue a new access token.
///
/// The refresh token comes from its cookie and must belong to the current
/// session. The consumed token stays valid for the configured grace period.
pub async fn refresh_token(
    State(state): State<AppState>,
    session: CurrentSession,
    request_headers: HeaderMap,
) -> HandlerResult<(HeaderMap, ApiResponse<RefreshTokenResp>)> {
    let (Some(sess_id), Some(data)) = (session.id.as_deref(), session.data()) else {
        return Err(unauthorized("Refresh without a session"));
    };

    let Some(token) = cookies::read_cookie(&request_headers, cookies::REFRESH_TOKEN_COOKIE) else {
        return Err(unauthorized("Refresh token cookie is empty"));
    };

    match state.tokens.validate_and_consume_refresh(&token, sess_id).await {
        Ok(()) => {}
        Err(AuthError::InvalidRefreshToken) => {
            return Err(unauthorized("Refresh token invalid"));
        }
        Err(e) => {
            tracing::error!("Refresh token consumption failed: {}", e);
            return Err(ApiResponse::fail_with(e.code(), e.client_message()));
        }
    }

    if data.user_id.is_empty() || data.account.is_empty() {
        return Err(unauthorized("Session has no user"));
    }

    let mut headers = HeaderMap::new();
    let (access, refresh) =
        issue_token_pair(&state, &data.user_id, &data.account, sess_id, &mut headers).await?;

    Ok((
        headers,
        ApiResponse::ok(RefreshTokenResp {
            access_token: access.token,
            expires_at: access.expires_at.timestamp(),
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at.timestamp(),
        }),
    ))
}

/// Log out: revoke the access token, consume the refresh token and drop
/// the session.
///
/// Store failures are logged; the client always gets its cookies cleared.
pub async fn logout(
    State(state): State<AppState>,
    session: CurrentSession,
    Extension(ctx): Extension<RequestContext>,
    request_headers: HeaderMap,
) -> HandlerResult<(HeaderMap, ApiResponse<Empty>)> {
    let sess_id = session.id();
    let config = state.sessions.config();
    let mut headers = HeaderMap::new();

    if let Err(e) = state.tokens.revoke_access_token(&ctx, sess_id).await {
        tracing::error!("Failed to revoke access token: {}", e);
    }

    if let Some(token) = cookies::read_cookie(&request_headers, cookies::REFRESH_TOKEN_COOKIE) {
        if let Err(e) = state.tokens.validate_and_consume_refresh(&token, sess_id).await {
            tracing::error!("Failed to consume refresh token: {}", e);
        }
        append_cookie(&mut headers, cookies::clear_refresh_cookie(config))?;
    }

    if !sess_id.is_empty() {
        if let Err(e) = state.sessions.remove(sess_id).await {
            tracing::error!("Failed to remove session: {}", e);
        }
    }
    append_cookie(&mut headers, cookies::clear_session_cookie(config))?;

    tracing::info!("Logout success for {}", ctx.payload().account);
    Ok((headers, ApiResponse::ok(Empty {})))
}

/// Profile of the authenticated user
pub async fn info(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> HandlerResult<ApiResponse<GetUserInfoResp>> {
    let payload = ctx.payload();
    if payload.user_id.is_empty() {
        return Err(unauthorized("Token carries no user"));
    }

    let user = state
        .accounts
        .get_by_user_id(&payload.user_id)
        .await
        .map_err(credential_failure)?;

    Ok(ApiResponse::ok(GetUserInfoResp {
        user_id: user.user_id,
        account: user.account,
        name: user.name,
        created_at: user.created_at.timestamp(),
        updated_at: user.updated_at.timestamp(),
    }))
}

/// Change the display name
pub async fn update_info(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UpdateInfoReq>,
) -> HandlerResult<ApiResponse<Empty>> {
    let payload = ctx.payload();
    if payload.user_id.is_empty() {
        return Err(unauthorized("Token carries no user"));
    }

    state
        .accounts
        .update_info(&payload.user_id, &req.name)
        .await
        .map_err(credential_failure)?;

    Ok(ApiResponse::ok(Empty {}))
}

/// Change the password.
///
/// Bumps the credential version, so every session opened before the change
/// (this one included) is rejected by the credential gate from now on.
pub async fn update_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UpdatePasswordReq>,
) -> HandlerResult<ApiResponse<Empty>> {
    let payload = ctx.payload();
    if payload.user_id.is_empty() {
        return Err(unauthorized("Token carries no user"));
    }

    let version = state
        .accounts
        .update_password(&payload.user_id, &req.old_password, &req.new_password)
        .await
        .map_err(credential_failure)?;

    tracing::info!(
        "Password of {} changed, credential version now {}",
        payload.account,
        version
    );
    Ok(ApiResponse::ok(Empty {}))
}
