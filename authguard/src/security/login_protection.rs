//! Brute-force protection for the login endpoint.
//!
//! Failed logins are counted per client IP. Once an IP fails `limit` times
//! inside one window it is blocked for `block_minutes` and marked for
//! `level_duration_secs`. Failing again while marked escalates to a block of
//! `block_hours`.
//!
//! ```text
//! Level 0 --limit failures--> Level 1 (minute block + marker)
//! Level 1 --limit failures, marker alive--> Level 2 (hour block)
//! ```
//!
//! Blocks and markers expire passively.

use super::{
    errors::{GuardRejection, GuardResult},
    interceptor::{Interceptor, KEY_PREFIX},
    normalize_ip,
};
use crate::{
    config::LoginProtectionConfig,
    outcome::{ErrorCode, Outcome},
    store::CounterStore,
};
use std::{sync::Arc, time::Duration};

const BLOCK_HOUR: &str = "login_block_h:";
const BLOCK_MINUTE: &str = "login_block_m:";
const FAIL_LEVEL: &str = "login_fail_level:";
const FAIL_COUNTER: &str = "login_fail:";

/// What a completed login attempt did to the IP's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    /// Success, or a failure unrelated to the credentials
    Ignored,
    /// Failure counted, still under the limit
    Counted,
    /// Minute block applied
    BlockedMinutes,
    /// Hour block applied
    BlockedHours,
}

/// Per-IP login failure guard
pub struct LoginGuard {
    store: Arc<dyn CounterStore>,
    config: LoginProtectionConfig,
    failures: Interceptor,
}

impl LoginGuard {
    pub fn new(store: Arc<dyn CounterStore>, config: LoginProtectionConfig) -> Self {
        // The block triggers on the limit-th failure, i.e. once the counter
        // exceeds limit - 1.
        let failures = Interceptor::new(
            store.clone(),
            config.window_secs,
            config.limit.saturating_sub(1),
        );
        Self {
            store,
            config,
            failures,
        }
    }

    fn block_hour_key(ip: &str) -> String {
        format!("{}{}{}", KEY_PREFIX, BLOCK_HOUR, ip)
    }

    fn block_minute_key(ip: &str) -> String {
        format!("{}{}{}", KEY_PREFIX, BLOCK_MINUTE, ip)
    }

    fn level_key(ip: &str) -> String {
        format!("{}{}", FAIL_LEVEL, ip)
    }

    async fn key_exists(&self, key: &str) -> bool {
        match self.store.exists(key).await {
            Ok(present) => present,
            Err(e) => {
                log::warn!("Login protection lookup of {} failed: {}", key, e);
                false
            }
        }
    }

    /// Reject the request when the IP is currently blocked.
    ///
    /// Never consumes quota. The hour block is checked first.
    pub async fn pre_check(&self, ip: &str) -> GuardResult {
        let ip = normalize_ip(ip);

        if self.key_exists(&Self::block_hour_key(ip)).await {
            return Err(GuardRejection::new(
                ErrorCode::RequestBlocked,
                format!(
                    "Too many login failures, please try again after {} hours",
                    self.config.block_hours
                ),
            ));
        }

        if self.key_exists(&Self::block_minute_key(ip)).await {
            return Err(GuardRejection::new(
                ErrorCode::RequestBlocked,
                format!(
                    "Too many login failures, please try again after {} minutes",
                    self.config.block_minutes
                ),
            ));
        }

        Ok(())
    }

    /// Record the result of a login attempt that passed [`pre_check`](Self::pre_check).
    pub async fn post_check(&self, ip: &str, outcome: Outcome) -> FailureVerdict {
        if outcome.success || !outcome.code.is_credential_failure() {
            return FailureVerdict::Ignored;
        }

        let ip = normalize_ip(ip);
        let allowed = match self.failures.allow(&format!("{}{}", FAIL_COUNTER, ip)).await {
            Ok(allowed) => allowed,
            Err(e) => {
                log::error!("Login failure counter error for {}: {}", ip, e);
                return FailureVerdict::Ignored;
            }
        };

        if allowed {
            return FailureVerdict::Counted;
        }

        if self.key_exists(&Self::level_key(ip)).await {
            let hours = Duration::from_secs(self.config.block_hours * 3600);
            if let Err(e) = self.store.set(&Self::block_hour_key(ip), "1", hours).await {
                log::error!("Failed to set hour block for {}: {}", ip, e);
            }
            log::info!("Login protection: IP {} blocked for {}h (Level 2)", ip, self.config.block_hours);
            return FailureVerdict::BlockedHours;
        }

        // Two independent writes. If only the block lands, the IP simply
        // repeats Level 1 next time.
        let minutes = Duration::from_secs(self.config.block_minutes * 60);
        if let Err(e) = self.store.set(&Self::block_minute_key(ip), "1", minutes).await {
            log::error!("Failed to set minute block for {}: {}", ip, e);
        }
        let level = Duration::from_secs(self.config.level_duration_secs);
        if let Err(e) = self.store.set(&Self::level_key(ip), "1", level).await {
            log::error!("Failed to set failure level marker for {}: {}", ip, e);
        }
        log::info!("Login protection: IP {} blocked for {}m (Level 1)", ip, self.config.block_minutes);
        FailureVerdict::BlockedMinutes
    }
}
