//! # authguard
//!
//! Session authentication and abuse protection for login-style HTTP APIs.
//!
//! The library provides three cooperating pieces, all coordinated through a
//! shared key-value [`store`]:
//!
//! - **Dual tokens**: a short-lived access token and a rotating refresh
//!   token, both bound to a server-side session by a checksum and both
//!   revocable through existence records ([`auth`], [`token`])
//! - **Fixed-window rate limiting** built on one atomic
//!   increment-with-expiry operation ([`security::interceptor`])
//! - **Brute-force protection**: escalating per-IP login blocks, a
//!   per-account success throttle, a registration cooldown and a
//!   credential-version gate that expires sessions after a password change
//!   ([`security`])
//!
//! Account storage and password hashing live in [`credential`] and
//! [`digest`]; the response envelope and error codes in [`outcome`].
//!
//! ## Example
//!
//! ```
//! use authguard::{
//!     auth::TokenLifecycle,
//!     config::TokenConfig,
//!     store::MemoryCounterStore,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), authguard::auth::AuthError> {
//! let store = Arc::new(MemoryCounterStore::new());
//! let tokens = TokenLifecycle::new(
//!     store,
//!     TokenConfig::new("access-secret-access-secret-0123", "refresh-secret-refresh-secret-01"),
//! );
//!
//! let issued = tokens.issue_access_token("user-1", "alice", "session-1").await?;
//! let ctx = tokens.validate_access_token(&issued.token, "session-1").await?;
//! assert_eq!(ctx.payload().account, "alice");
//! # Ok(())
//! # }
//! ```

/// Access/refresh token lifecycle and server-side sessions.
pub mod auth;

/// Configuration structs with defaults and environment overlays.
pub mod config;

/// Accounts, credentials and the account service.
pub mod credential;

/// Salted digest functions.
pub mod digest;

/// Response envelope and error codes.
pub mod outcome;

/// Rate limiting and brute-force guards.
pub mod security;

/// Shared counter store.
pub mod store;

/// Token signing and verification.
pub mod token;

pub use auth::{AuthError, RequestContext, SessionData, SessionStore, TokenLifecycle};
pub use outcome::{CommonResponse, ErrorCode, Outcome};
pub use store::{CounterStore, MemoryCounterStore, PgCounterStore};
