//! Per-path request rate limiting.

use super::{
    errors::{GuardRejection, GuardResult},
    interceptor::Interceptor,
};
use crate::{config::RateLimitRule, outcome::ErrorCode, store::CounterStore};
use std::{collections::HashMap, sync::Arc};

struct PathRule {
    interceptor: Interceptor,
    has_session: bool,
}

impl PathRule {
    fn new(store: Arc<dyn CounterStore>, rule: &RateLimitRule) -> Self {
        Self {
            interceptor: Interceptor::new(store, rule.window_secs, rule.limit),
            has_session: rule.has_session,
        }
    }
}

/// Applies one fixed-window limit per configured path and a fallback limit
/// to every other path.
pub struct PathRateLimiter {
    rules: HashMap<String, PathRule>,
    fallback: PathRule,
}

impl PathRateLimiter {
    /// Build the limiter.
    ///
    /// Rules with an empty path or a zero window or limit are ignored. A later
    /// rule for the same path replaces an earlier one.
    pub fn new(store: Arc<dyn CounterStore>, rules: &[RateLimitRule]) -> Self {
        let rules = rules
            .iter()
            .filter(|r| !r.path.is_empty() && r.window_secs > 0 && r.limit > 0)
            .map(|r| (r.path.clone(), PathRule::new(store.clone(), r)))
            .collect();

        Self {
            rules,
            fallback: PathRule::new(store, &RateLimitRule::fallback()),
        }
    }

    /// Count the request and reject it once the path's window is used up.
    ///
    /// The counter is keyed on the session id for session-scoped rules and on
    /// the client IP otherwise. Store failures let the request through.
    pub async fn check(&self, path: &str, ip: &str, session_id: Option<&str>) -> GuardResult {
        let rule = self.rules.get(path).unwrap_or(&self.fallback);

        let identity = if rule.has_session {
            session_id.unwrap_or_default()
        } else {
            ip
        };
        let key = format!("{}:{}", path, identity);

        match rule.interceptor.allow(&key).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GuardRejection::from_code(ErrorCode::TooManyRequests)),
            Err(e) => {
                log::error!("Rate limit error for key {}: {}", key, e);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCounterStore;
    use std::time::Duration;

    fn limiter(rules: &[RateLimitRule]) -> (Arc<MemoryCounterStore>, PathRateLimiter) {
        let store = Arc::new(MemoryCounterStore::new());
        (store.clone(), PathRateLimiter::new(store, rules))
    }

    fn rule(path: &str, window_secs: u64, limit: u64, has_session: bool) -> RateLimitRule {
        RateLimitRule {
            path: path.to_string(),
            window_secs,
            limit,
            has_session,
        }
    }

    #[tokio::test]
    async fn test_fallback_rule_allows_two_per_second() {
        tokio::time::pause();
        let (_, limiter) = limiter(&[]);

        assert!(limiter.check("/x", "1.1.1.1", None).await.is_ok());
        assert!(limiter.check("/x", "1.1.1.1", None).await.is_ok());
        let err = limiter.check("/x", "1.1.1.1", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TooManyRequests);

        tokio::time::advance(Duration::from_millis(1100)).await;
        assert!(limiter.check("/x", "1.1.1.1", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_configured_rule_is_used() {
        let (_, limiter) = limiter(&[rule("/login", 60, 1, false)]);

        assert!(limiter.check("/login", "ip", None).await.is_ok());
        assert!(limiter.check("/login", "ip", None).await.is_err());
        assert!(limiter.check("/login", "other-ip", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_rule_keys_on_session() {
        let (_, limiter) = limiter(&[rule("/info", 60, 1, true)]);

        assert!(limiter.check("/info", "ip", Some("s1")).await.is_ok());
        // Same session from another address is still limited
        assert!(limiter.check("/info", "ip2", Some("s1")).await.is_err());
        assert!(limiter.check("/info", "ip", Some("s2")).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_rules_are_ignored() {
        let (_, limiter) = limiter(&[rule("/a", 0, 100, false), rule("", 60, 100, false)]);

        // Falls back to 2 per second
        assert!(limiter.check("/a", "ip", None).await.is_ok());
        assert!(limiter.check("/a", "ip", None).await.is_ok());
        assert!(limiter.check("/a", "ip", None).await.is_err());
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let (store, limiter) = limiter(&[rule("/a", 60, 1, false)]);
        store
            .set("rate_limit:/a:ip", "garbage", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(limiter.check("/a", "ip", None).await.is_ok());
        assert!(limiter.check("/a", "ip", None).await.is_ok());
    }
}
