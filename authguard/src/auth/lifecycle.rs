//! Access and refresh token lifecycle.
//!
//! A signature alone never makes a token valid. Every issued token also gets
//! an existence record in the shared store with the same lifetime, and
//! validation requires the record to be present. Deleting the record revokes
//! the token immediately.
//!
//! ```text
//! Unissued --issue--> Issued --consume (refresh)--> Consumed (grace, then gone)
//!                       |
//!                       +--revoke (access)--> Revoked
//! ```

use super::{
    context::RequestContext,
    errors::{AuthError, AuthResult},
};
use crate::{
    config::TokenConfig,
    store::{CounterStore, KeyTtl},
    token::{IssuedToken, Payload, TokenCodec},
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};

const ACCESS_RECORD: &str = "jwt_id_exist:";
const REFRESH_RECORD: &str = "refresh_token:";

fn access_key(token_id: &str) -> String {
    format!("{}{}", ACCESS_RECORD, token_id)
}

fn refresh_key(token_id: &str) -> String {
    format!("{}{}", REFRESH_RECORD, token_id)
}

/// Issues, validates, rotates and revokes session-bound tokens.
///
/// Built once at startup and shared behind an `Arc`.
pub struct TokenLifecycle {
    store: Arc<dyn CounterStore>,
    config: TokenConfig,
}

impl TokenLifecycle {
    pub fn new(store: Arc<dyn CounterStore>, config: TokenConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Issue an access token for a user bound to `sess_id`
    ///
    /// # Errors
    ///
    /// * `AuthError::Token` - Signing failed
    /// * `AuthError::Store` - Existence record could not be written; the
    ///   token is not returned
    pub async fn issue_access_token(
        &self,
        user_id: &str,
        account: &str,
        sess_id: &str,
    ) -> AuthResult<IssuedToken> {
        let issued = TokenCodec::issue(
            Payload::new(user_id, account),
            self.config.access_ttl,
            sess_id,
            self.config.access_secret.as_bytes(),
            &self.config.issuer,
        )?;

        self.store
            .set(&access_key(&issued.token_id), "1", self.config.access_ttl)
            .await
            .inspect_err(|e| log::error!("Failed to record access token: {}", e))?;

        Ok(issued)
    }

    /// Issue a refresh token bound to `sess_id`. It carries no identity.
    pub async fn issue_refresh_token(&self, sess_id: &str) -> AuthResult<IssuedToken> {
        let issued = TokenCodec::issue(
            Payload::default(),
            self.config.refresh_ttl,
            sess_id,
            self.config.refresh_secret.as_bytes(),
            &self.config.issuer,
        )?;

        self.store
            .set(&refresh_key(&issued.token_id), "1", self.config.refresh_ttl)
            .await
            .inspect_err(|e| log::error!("Failed to record refresh token: {}", e))?;

        Ok(issued)
    }

    /// Validate an access token presented with session `sess_id`.
    ///
    /// Signature, expiry, session binding and the existence record must all
    /// check out. Any failure, including an unreachable store, is
    /// `AuthError::Unauthorized`.
    pub async fn validate_access_token(&self, token: &str, sess_id: &str) -> AuthResult<RequestContext> {
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        let claims = TokenCodec::verify(token, self.config.access_secret.as_bytes()).map_err(|e| {
            log::info!("Access token rejected: {}", e);
            AuthError::Unauthorized
        })?;

        if !claims.checksum_matches(sess_id) {
            log::info!("Access token {} presented with a foreign session", claims.jti);
            return Err(AuthError::Unauthorized);
        }

        match self.store.exists(&access_key(&claims.jti)).await {
            Ok(true) => Ok(RequestContext::authenticated(claims)),
            Ok(false) => {
                log::info!("Access token {} revoked or expired", claims.jti);
                Err(AuthError::Unauthorized)
            }
            Err(e) => {
                log::error!("Access token lookup failed: {}", e);
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Validate a refresh token and mark it consumed.
    ///
    /// The existence record is not deleted outright: its lifetime shrinks to
    /// the configured grace period so concurrent requests racing the rotation
    /// still succeed. Once the grace period ends the token is dead.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidRefreshToken` - Bad signature, expired, wrong
    ///   session or no longer recorded
    /// * `AuthError::Unauthorized` - Store unreachable
    pub async fn validate_and_consume_refresh(&self, token: &str, sess_id: &str) -> AuthResult<()> {
        let claims = TokenCodec::verify(token, self.config.refresh_secret.as_bytes()).map_err(|e| {
            log::info!("Refresh token rejected: {}", e);
            AuthError::InvalidRefreshToken
        })?;

        if !claims.checksum_matches(sess_id) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let key = refresh_key(&claims.jti);
        let remaining = match self.store.ttl(&key).await {
            Ok(KeyTtl::Missing) => return Err(AuthError::InvalidRefreshToken),
            Ok(ttl) => ttl,
            Err(e) => {
                log::error!("Refresh token lookup failed: {}", e);
                return Err(AuthError::Unauthorized);
            }
        };

        let time_left = claims.exp - Utc::now().timestamp();
        if time_left <= 0 {
            self.store.del(&key).await?;
            return Ok(());
        }

        let mut grace = self
            .config
            .refresh_removal_grace
            .min(Duration::from_secs(time_left as u64));
        if let Some(remaining) = remaining.remaining() {
            grace = grace.min(remaining);
        }

        self.store.expire(&key, grace).await?;
        Ok(())
    }

    /// Revoke the access token that authenticated `ctx`.
    ///
    /// Does nothing when the context is anonymous or its token was not
    /// issued for `sess_id`.
    pub async fn revoke_access_token(&self, ctx: &RequestContext, sess_id: &str) -> AuthResult<()> {
        let Some(claims) = ctx.claims() else {
            return Ok(());
        };
        if !claims.checksum_matches(sess_id) {
            return Ok(());
        }

        self.store.del(&access_key(&claims.jti)).await?;
        Ok(())
    }
}
