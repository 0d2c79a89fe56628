//! Dual-token authentication bound to server-side sessions.
//!
//! - [`TokenLifecycle`]: short-lived access tokens and rotating refresh
//!   tokens, each backed by an existence record so they can be revoked
//! - [`SessionStore`]: server-side sessions the tokens are bound to
//! - [`RequestContext`]: claims of the authenticated request, passed explicitly

pub mod context;
pub mod errors;
pub mod lifecycle;
pub mod session;

pub use context::RequestContext;
pub use errors::{AuthError, AuthResult};
pub use lifecycle::TokenLifecycle;
pub use session::{SessionData, SessionStore};
