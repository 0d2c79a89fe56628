//! Registration abuse guard.
//!
//! A successful registration blocks further registrations from the same IP
//! for `block_minutes`. Failed registrations never block.

use super::{
    errors::{GuardRejection, GuardResult},
    interceptor::KEY_PREFIX,
    normalize_ip,
};
use crate::{
    config::RegisterProtectionConfig,
    outcome::{ErrorCode, Outcome},
    store::{CounterStore, KeyTtl},
};
use std::{sync::Arc, time::Duration};

const REGISTER_BLOCK: &str = "register_block:";

pub struct RegisterGuard {
    store: Arc<dyn CounterStore>,
    config: RegisterProtectionConfig,
}

impl RegisterGuard {
    pub fn new(store: Arc<dyn CounterStore>, config: RegisterProtectionConfig) -> Self {
        Self { store, config }
    }

    fn key(ip: &str) -> String {
        format!("{}{}{}", KEY_PREFIX, REGISTER_BLOCK, ip)
    }

    /// Reject registrations from an IP that registered recently.
    ///
    /// The message reports the remaining whole minutes, rounded up, or the
    /// configured block length when the remaining time is unknown.
    pub async fn pre_check(&self, ip: &str) -> GuardResult {
        let ip = normalize_ip(ip);
        let ttl = match self.store.ttl(&Self::key(ip)).await {
            Ok(ttl) => ttl,
            Err(e) => {
                log::warn!("Register protection lookup failed for {}: {}", ip, e);
                return Ok(());
            }
        };

        let minutes = match ttl {
            KeyTtl::Missing => return Ok(()),
            KeyTtl::Persistent => self.config.block_minutes,
            KeyTtl::Expires(remaining) => remaining.as_secs().div_ceil(60).max(1),
        };

        Err(GuardRejection::new(
            ErrorCode::RequestBlocked,
            format!(
                "Registration is temporarily blocked. Please try again after {} minutes",
                minutes
            ),
        ))
    }

    /// Block the IP after a successful registration
    pub async fn post_check(&self, ip: &str, outcome: Outcome) {
        if !outcome.success {
            return;
        }

        let ip = normalize_ip(ip);
        let block = Duration::from_secs(self.config.block_minutes * 60);
        match self.store.set(&Self::key(ip), "1", block).await {
            Ok(()) => log::info!(
                "Register protection: IP {} blocked for {}m after successful registration",
                ip,
                self.config.block_minutes
            ),
            Err(e) => log::error!("Failed to set register block for {}: {}", ip, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCounterStore;

    fn guard() -> (Arc<MemoryCounterStore>, RegisterGuard) {
        let store = Arc::new(MemoryCounterStore::new());
        let guard = RegisterGuard::new(store.clone(), RegisterProtectionConfig::default());
        (store, guard)
    }

    #[tokio::test]
    async fn test_success_blocks_same_ip_only() {
        let (_, guard) = guard();

        assert!(guard.pre_check("10.0.0.1").await.is_ok());
        guard.post_check("10.0.0.1", Outcome::success()).await;

        let err = guard.pre_check("10.0.0.1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RequestBlocked);
        assert_eq!(
            err.message,
            "Registration is temporarily blocked. Please try again after 10 minutes"
        );
        assert!(guard.pre_check("10.0.0.2").await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_never_blocks() {
        let (_, guard) = guard();

        for _ in 0..5 {
            guard
                .post_check("10.0.0.1", Outcome::failure(ErrorCode::UserNameDuplicated))
                .await;
        }
        assert!(guard.pre_check("10.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_message_reports_remaining_minutes() {
        tokio::time::pause();
        let (_, guard) = guard();
        guard.post_check("ip", Outcome::success()).await;

        tokio::time::advance(Duration::from_secs(7 * 60 + 30)).await;
        let err = guard.pre_check("ip").await.unwrap_err();
        assert!(err.message.ends_with("after 3 minutes"));

        tokio::time::advance(Duration::from_secs(3 * 60)).await;
        assert!(guard.pre_check("ip").await.is_ok());
    }

    #[tokio::test]
    async fn test_orphaned_block_uses_configured_minutes() {
        let (store, guard) = guard();
        store.insert_persistent("rate_limit:register_block:ip", "1").await;

        let err = guard.pre_check("ip").await.unwrap_err();
        assert!(err.message.ends_with("after 10 minutes"));
    }
}
