//! Log ID middleware for request correlation.
//!
//! Every request carries a log ID: taken from the `X-Log-ID` request header
//! when the caller supplies one, generated otherwise. It is attached to the
//! request's tracing span, stored in request extensions and echoed in the
//! response headers.

use authguard::token::id_gen;
use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;

/// Header name for the log ID
pub const LOG_ID_HEADER: &str = "x-log-id";

/// Longest caller-supplied log ID that is accepted as is
const MAX_LOG_ID_LEN: usize = 128;

/// Extract the caller's log ID or generate a new one
fn get_or_generate_log_id(headers: &HeaderMap) -> String {
    headers
        .get(LOG_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_LOG_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(id_gen::new_id)
}

/// Middleware that assigns a log ID and writes the access log line
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use ag_server::api::request_id::log_id_middleware;
///
/// # async fn example() {
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(log_id_middleware));
/// # }
/// ```
pub async fn log_id_middleware(mut request: Request, next: Next) -> Response {
    let log_id = get_or_generate_log_id(request.headers());
    request.extensions_mut().insert(LogId(log_id.clone()));

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("request", log_id = %log_id);

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    if let Ok(header_value) = HeaderValue::from_str(&log_id) {
        response.headers_mut().insert(LOG_ID_HEADER, header_value);
    }

    span.in_scope(|| {
        tracing::info!(
            status = %response.status(),
            latency_ms = started.elapsed().as_millis() as u64,
            method = %method,
            path = %path,
            "Request completed"
        );
    });

    response
}

/// Log ID of the current request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogId(pub String);

impl LogId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for LogId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<LogId>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Log ID not found in extensions",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_log_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(LOG_ID_HEADER, HeaderValue::from_static("test-id-123"));

        assert_eq!(get_or_generate_log_id(&headers), "test-id-123");
    }

    #[test]
    fn test_log_id_generated_when_missing() {
        let first = get_or_generate_log_id(&HeaderMap::new());
        let second = get_or_generate_log_id(&HeaderMap::new());

        assert!(!first.is_empty());
        assert_ne!(first, second);
    }

    #[test]
    fn test_oversized_log_id_replaced() {
        let mut headers = HeaderMap::new();
        let long = "x".repeat(MAX_LOG_ID_LEN + 1);
        headers.insert(LOG_ID_HEADER, HeaderValue::from_str(&long).unwrap());

        assert_ne!(get_or_generate_log_id(&headers), long);
    }
}
