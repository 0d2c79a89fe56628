//! Session and refresh-token cookies.

use authguard::config::SessionConfig;
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use std::time::Duration;

/// Name of the cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Value of cookie `name` in the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
        .find(|val| !val.is_empty())
}

/// Build a `Set-Cookie` value with the session cookie attributes
fn build(
    config: &SessionConfig,
    name: &str,
    value: &str,
    max_age: Duration,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; SameSite={}",
        name,
        value,
        config.path,
        max_age.as_secs(),
        config.same_site
    );
    if let Some(domain) = &config.domain {
        cookie.push_str(&format!("; Domain={}", domain));
    }
    if config.http_only {
        cookie.push_str("; HttpOnly");
    }
    if config.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn session_cookie(config: &SessionConfig, sess_id: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    build(config, &config.cookie_name, sess_id, config.max_age)
}

pub fn clear_session_cookie(config: &SessionConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    build(config, &config.cookie_name, "", Duration::ZERO)
}

/// Refresh cookie living exactly as long as the token
pub fn refresh_cookie(
    config: &SessionConfig,
    token: &str,
    ttl: Duration,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build(config, REFRESH_TOKEN_COOKIE, token, ttl)
}

pub fn clear_refresh_cookie(config: &SessionConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    build(config, REFRESH_TOKEN_COOKIE, "", Duration::ZERO)
}
