//! Guards protecting the authentication endpoints.
//!
//! All guards keep their state in the shared [`CounterStore`](crate::store::CounterStore)
//! and follow a pre-check / post-check shape: the pre-check runs before the
//! handler and may reject the request, the post-check inspects the handler's
//! [`Outcome`](crate::outcome::Outcome) and updates counters or blocks.
//!
//! - [`interceptor`]: fixed-window counter shared by every limiter
//! - [`path_limit`]: per-path request rate limiting
//! - [`login_protection`]: escalating per-IP blocks after failed logins
//! - [`login_success`]: per-account cap on successful logins
//! - [`register_protection`]: per-IP cooldown after a registration
//! - [`credential_gate`]: rejects sessions made stale by a password change
//!
//! Store failures never lock users out: limiters log them and let the
//! request through.

pub mod credential_gate;
pub mod errors;
pub mod interceptor;
pub mod login_protection;
pub mod login_success;
pub mod path_limit;
pub mod register_protection;

pub use credential_gate::CredentialGate;
pub use errors::{GuardRejection, GuardResult};
pub use interceptor::Interceptor;
pub use login_protection::{FailureVerdict, LoginGuard};
pub use login_success::LoginSuccessThrottle;
pub use path_limit::PathRateLimiter;
pub use register_protection::RegisterGuard;

/// Client address used as a counter key, `"unknown"` when absent
pub fn normalize_ip(ip: &str) -> &str {
    let ip = ip.trim();
    if ip.is_empty() { "unknown" } else { ip }
}
