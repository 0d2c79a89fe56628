//! Request-scoped authentication state.

use crate::token::{Claims, Payload};

/// Claims of the access token that authenticated the current request.
///
/// Produced by [`TokenLifecycle::validate_access_token`](super::TokenLifecycle::validate_access_token)
/// and handed explicitly to handlers and to revocation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    claims: Option<Claims>,
}

impl RequestContext {
    pub fn authenticated(claims: Claims) -> Self {
        Self {
            claims: Some(claims),
        }
    }

    /// Context of a request without a valid access token
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Identity of the caller, empty when unauthenticated
    pub fn payload(&self) -> Payload {
        self.claims
            .as_ref()
            .map(|c| c.payload.clone())
            .unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }
}
