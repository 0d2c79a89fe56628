//! Configuration for the token lifecycle, sessions and guards.
//!
//! Every struct has a `Default` matching production values and a
//! `from_env()` constructor that overlays environment variables. Values that
//! fail to parse, and non-positive durations or limits, fall back to the
//! defaults.

use std::time::Duration;

/// Parse an environment variable, falling back to `default`
pub fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_env_or`] but rejects zero and negative values
fn positive_env_or(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map_or(default, |v| v as u64)
}

/// Token signing and lifetime configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// `iss` claim written into every token
    pub issuer: String,
    /// HMAC key for access tokens
    pub access_secret: String,
    /// HMAC key for refresh tokens
    pub refresh_secret: String,
    /// Access token validity (default 30 minutes)
    pub access_ttl: Duration,
    /// Refresh token validity (default 30 days)
    pub refresh_ttl: Duration,
    /// How long a consumed refresh token stays usable (default 60 seconds)
    pub refresh_removal_grace: Duration,
}

impl TokenConfig {
    pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(30 * 60);
    pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
    pub const DEFAULT_REFRESH_GRACE: Duration = Duration::from_secs(60);

    /// Configuration with default lifetimes
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            issuer: "authguard".to_string(),
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Self::DEFAULT_ACCESS_TTL,
            refresh_ttl: Self::DEFAULT_REFRESH_TTL,
            refresh_removal_grace: Self::DEFAULT_REFRESH_GRACE,
        }
    }

    /// Overlay `TOKEN_ISSUER`, `ACCESS_TOKEN_TTL_SECS`,
    /// `REFRESH_TOKEN_TTL_SECS` and `REFRESH_TOKEN_GRACE_SECS`
    pub fn from_env(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        let defaults = Self::new(access_secret, refresh_secret);
        Self {
            issuer: parse_env_or("TOKEN_ISSUER", defaults.issuer),
            access_ttl: Duration::from_secs(positive_env_or(
                "ACCESS_TOKEN_TTL_SECS",
                Self::DEFAULT_ACCESS_TTL.as_secs(),
            )),
            refresh_ttl: Duration::from_secs(positive_env_or(
                "REFRESH_TOKEN_TTL_SECS",
                Self::DEFAULT_REFRESH_TTL.as_secs(),
            )),
            refresh_removal_grace: Duration::from_secs(positive_env_or(
                "REFRESH_TOKEN_GRACE_SECS",
                Self::DEFAULT_REFRESH_GRACE.as_secs(),
            )),
            ..defaults
        }
    }
}

/// Server-side session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub key_prefix: String,
    pub max_age: Duration,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    /// `Strict`, `Lax` or `None`
    pub same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "auth_session_id".to_string(),
            key_prefix: "auth_session:".to_string(),
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: "Lax".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cookie_name: parse_env_or("SESSION_COOKIE_NAME", defaults.cookie_name),
            key_prefix: parse_env_or("SESSION_KEY_PREFIX", defaults.key_prefix),
            max_age: Duration::from_secs(positive_env_or(
                "SESSION_MAX_AGE_SECS",
                defaults.max_age.as_secs(),
            )),
            path: parse_env_or("SESSION_COOKIE_PATH", defaults.path),
            domain: std::env::var("SESSION_COOKIE_DOMAIN")
                .ok()
                .filter(|d| !d.is_empty()),
            secure: parse_env_or("SESSION_COOKIE_SECURE", defaults.secure),
            http_only: parse_env_or("SESSION_COOKIE_HTTP_ONLY", defaults.http_only),
            same_site: parse_env_or("SESSION_COOKIE_SAME_SITE", defaults.same_site),
        }
    }
}

/// Login brute-force protection and success throttle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginProtectionConfig {
    /// Failure counting window
    pub window_secs: u64,
    /// Failures tolerated per window before a block
    pub limit: u64,
    /// Level 1 block length
    pub block_minutes: u64,
    /// Level 2 block length
    pub block_hours: u64,
    /// How long an IP stays marked after a Level 1 block
    pub level_duration_secs: u64,
    /// Per-account success counting window
    pub success_window_secs: u64,
    /// Successful logins allowed per account per window
    pub success_limit: u64,
}

impl Default for LoginProtectionConfig {
    fn default() -> Self {
        Self {
            window_secs: 300,
            limit: 3,
            block_minutes: 5,
            block_hours: 24,
            level_duration_secs: 30 * 60,
            success_window_secs: 60,
            success_limit: 10,
        }
    }
}

impl LoginProtectionConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            window_secs: positive_env_or("LOGIN_FAIL_WINDOW_SECS", d.window_secs),
            limit: positive_env_or("LOGIN_FAIL_LIMIT", d.limit),
            block_minutes: positive_env_or("LOGIN_BLOCK_MINUTES", d.block_minutes),
            block_hours: positive_env_or("LOGIN_BLOCK_HOURS", d.block_hours),
            level_duration_secs: positive_env_or("LOGIN_FAIL_LEVEL_SECS", d.level_duration_secs),
            success_window_secs: positive_env_or("LOGIN_SUCCESS_WINDOW_SECS", d.success_window_secs),
            success_limit: positive_env_or("LOGIN_SUCCESS_LIMIT", d.success_limit),
        }
    }
}

/// Registration abuse protection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterProtectionConfig {
    /// How long an IP is blocked after a successful registration
    pub block_minutes: u64,
}

impl Default for RegisterProtectionConfig {
    fn default() -> Self {
        Self { block_minutes: 10 }
    }
}

impl RegisterProtectionConfig {
    pub fn from_env() -> Self {
        Self {
            block_minutes: positive_env_or("REGISTER_BLOCK_MINUTES", Self::default().block_minutes),
        }
    }
}

/// Fixed-window limit applied to one request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    pub path: String,
    pub window_secs: u64,
    pub limit: u64,
    /// Key the counter on the session id instead of the client IP
    pub has_session: bool,
}

impl RateLimitRule {
    /// Rule applied to paths without an explicit one
    pub fn fallback() -> Self {
        Self {
            path: String::new(),
            window_secs: 1,
            limit: 2,
            has_session: false,
        }
    }

    /// Parse `RATE_LIMIT_RULES`: `path:window:limit[:session]` entries
    /// separated by commas. Malformed entries are skipped with a warning.
    pub fn list_from_env() -> Vec<Self> {
        std::env::var("RATE_LIMIT_RULES")
            .map(|raw| Self::parse_list(&raw))
            .unwrap_or_default()
    }

    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let rule = Self::parse(entry);
                if rule.is_none() {
                    log::warn!("Ignoring malformed rate limit rule: {}", entry);
                }
                rule
            })
            .collect()
    }

    fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split(':');
        let path = parts.next()?.trim();
        let window_secs = parts.next()?.trim().parse::<u64>().ok().filter(|w| *w > 0)?;
        let limit = parts.next()?.trim().parse::<u64>().ok().filter(|l| *l > 0)?;
        let has_session = match parts.next().map(str::trim) {
            None => false,
            Some("session") => true,
            Some(_) => return None,
        };
        if path.is_empty() || parts.next().is_some() {
            return None;
        }
        Some(Self {
            path: path.to_string(),
            window_secs,
            limit,
            has_session,
        })
    }
}

/// Credential-version gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialGateConfig {
    /// Allow the request when the version lookup itself fails
    pub fail_open_on_lookup_error: bool,
}

impl Default for CredentialGateConfig {
    fn default() -> Self {
        Self {
            fail_open_on_lookup_error: true,
        }
    }
}

impl CredentialGateConfig {
    pub fn from_env() -> Self {
        Self {
            fail_open_on_lookup_error: parse_env_or("CREDENTIAL_GATE_FAIL_OPEN", true),
        }
    }
}
