//! Request extractors shared by handlers and middlewares.

use super::{dto::Validate, response::ApiResponse};
use authguard::outcome::ErrorCode;
use axum::{
    Json,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::{HeaderMap, StatusCode, request::Parts},
};
use serde::de::DeserializeOwned;
use std::{convert::Infallible, net::SocketAddr};

/// JSON body that deserialized and passed [`Validate`].
///
/// Failures abort with `400 Bad Request` and a `ParamError` envelope.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::info!("Request body rejected: {}", rejection.body_text());
            param_error(rejection.body_text())
        })?;
        value.validate().map_err(param_error)?;
        Ok(ValidJson(value))
    }
}

pub fn param_error(message: impl Into<String>) -> ApiResponse {
    ApiResponse::abort(StatusCode::BAD_REQUEST, ErrorCode::ParamError, message)
}

/// Address of the client, as seen through proxies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    /// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let ip = forwarded
            .or(real_ip)
            .map(str::to_string)
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_default();

        ClientIp(authguard::security::normalize_ip(&ip).to_string())
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::resolve(&parts.headers, peer)
    }

    pub fn from_request(request: &Request) -> Self {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::resolve(request.headers(), peer)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 172.16.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));

        let peer = Some("127.0.0.1:4000".parse().unwrap());
        assert_eq!(ClientIp::resolve(&headers, peer).as_str(), "10.0.0.1");
    }

    #[test]
    fn test_peer_address_fallback() {
        let peer = Some("192.168.1.5:4000".parse().unwrap());
        assert_eq!(
            ClientIp::resolve(&HeaderMap::new(), peer).as_str(),
            "192.168.1.5"
        );
    }

    #[test]
    fn test_unknown_without_any_source() {
        assert_eq!(ClientIp::resolve(&HeaderMap::new(), None).as_str(), "unknown");
    }
}
