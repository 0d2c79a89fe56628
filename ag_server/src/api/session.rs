//! Session cookie loading.
//!
//! Resolves the session cookie into [`CurrentSession`] once per request so the
//! rate limiter, the access-token check, the credential gate and the handlers
//! all see the same session.

use super::{AppState, cookies, response::ApiResponse};
use authguard::{auth::SessionData, outcome::ErrorCode};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;

/// Session attached to the current request
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    /// Session id from a cookie that still resolves to stored data
    pub id: Option<String>,
    pub data: Option<SessionData>,
}

impl CurrentSession {
    /// Session id, empty when there is no live session
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    pub fn data(&self) -> Option<&SessionData> {
        self.data.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Load the session named by the session cookie into request extensions.
///
/// A cookie that no longer resolves to stored data counts as no session.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = &state.sessions.config().cookie_name;
    let current = match cookies::read_cookie(request.headers(), cookie_name) {
        None => CurrentSession::default(),
        Some(sess_id) => match state.sessions.load(&sess_id).await {
            Ok(Some(data)) => CurrentSession {
                id: Some(sess_id),
                data: Some(data),
            },
            Ok(None) => CurrentSession::default(),
            Err(e) => {
                tracing::error!("Failed to load session: {}", e);
                return ApiResponse::abort(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::ServerError,
                    e.client_message(),
                )
                .into_response();
            }
        },
    };

    request.extensions_mut().insert(current);
    next.run(request).await
}
