//! Per-account cap on successful logins.

use super::{
    errors::{GuardRejection, GuardResult},
    interceptor::Interceptor,
};
use crate::{
    config::LoginProtectionConfig,
    outcome::{ErrorCode, Outcome},
    store::CounterStore,
};
use std::sync::Arc;

const SUCCESS_COUNTER: &str = "login_success:";

/// Refuses further logins for an account that already logged in
/// `success_limit` times in the current window.
pub struct LoginSuccessThrottle {
    recorder: Interceptor,
}

impl LoginSuccessThrottle {
    pub fn new(store: Arc<dyn CounterStore>, config: &LoginProtectionConfig) -> Self {
        Self {
            recorder: Interceptor::new(store, config.success_window_secs, config.success_limit),
        }
    }

    fn key(account: &str) -> String {
        format!("{}{}", SUCCESS_COUNTER, account)
    }

    /// Peek at the account's counter without incrementing it
    pub async fn pre_check(&self, account: &str) -> GuardResult {
        if self.recorder.reach_limit(&Self::key(account)).await {
            return Err(GuardRejection::new(
                ErrorCode::LoginReachLimit,
                "Login limit reached, please try again later",
            ));
        }
        Ok(())
    }

    /// Count a successful login. Failures are not recorded.
    pub async fn post_check(&self, account: &str, outcome: Outcome) {
        if !outcome.success {
            return;
        }
        if let Err(e) = self.recorder.allow(&Self::key(account)).await {
            log::error!("Login success recorder error for {}: {}", account, e);
        }
    }
}
