//! Rejects sessions created before the account's last password change.

use super::errors::{GuardRejection, GuardResult};
use crate::{
    auth::SessionData,
    config::CredentialGateConfig,
    credential::{CredentialError, CredentialRepository},
    outcome::ErrorCode,
};
use std::sync::Arc;

/// Compares the credential version stored in a session with the current one
pub struct CredentialGate {
    repository: Arc<dyn CredentialRepository>,
    config: CredentialGateConfig,
}

impl CredentialGate {
    pub fn new(repository: Arc<dyn CredentialRepository>, config: CredentialGateConfig) -> Self {
        Self { repository, config }
    }

    /// Check the session of the current request.
    ///
    /// # Errors
    ///
    /// * `Unauthorized` - No logged-in session
    /// * `SessionExpired` - User gone, or the password changed since login
    /// * `ServerError` - Version lookup failed and the gate is configured to fail closed
    pub async fn check(&self, session: Option<&SessionData>) -> GuardResult {
        let Some(session) = session.filter(|s| !s.user_id.is_empty()) else {
            return Err(GuardRejection::new(ErrorCode::Unauthorized, "User not logged in"));
        };

        let current = match self.repository.find_credential(&session.user_id).await {
            Ok(Some(credential)) => credential.credential_version,
            Ok(None) | Err(CredentialError::UserNotExist) => {
                return Err(GuardRejection::new(ErrorCode::SessionExpired, "User not found"));
            }
            Err(e) => {
                log::error!("Credential version lookup failed for {}: {}", session.user_id, e);
                if self.config.fail_open_on_lookup_error {
                    return Ok(());
                }
                return Err(GuardRejection::from_code(ErrorCode::ServerError));
            }
        };

        if current != session.credential_version {
            log::info!(
                "Credential version mismatch: session={}, current={}, user_id={}",
                session.credential_version,
                current,
                session.user_id
            );
            return Err(GuardRejection::new(
                ErrorCode::SessionExpired,
                "Credential has changed, please login again",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{
        AccountService, Credential, CredentialResult, MemoryCredentialRepository, User,
    };
    use crate::digest::Sha256Digest;
    use async_trait::async_trait;

    struct BrokenRepository;

    #[async_trait]
    impl CredentialRepository for BrokenRepository {
        async fn find_by_account(&self, _: &str) -> CredentialResult<Option<User>> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn find_by_user_id(&self, _: &str) -> CredentialResult<Option<User>> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn find_credential(&self, _: &str) -> CredentialResult<Option<Credential>> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn create_user(&self, _: &User, _: &Credential) -> CredentialResult<()> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn update_credential(&self, _: i64, _: &Credential) -> CredentialResult<bool> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
        async fn update_name(&self, _: &str, _: &str) -> CredentialResult<bool> {
            Err(sqlx::Error::PoolTimedOut.into())
        }
    }

    fn session(user_id: &str, version: i64) -> SessionData {
        SessionData {
            user_id: user_id.to_string(),
            account: "alice".to_string(),
            name: "Alice".to_string(),
            credential_version: version,
        }
    }

    #[tokio::test]
    async fn test_password_change_expires_old_session() {
        let repo = Arc::new(MemoryCredentialRepository::new());
        let accounts = AccountService::new(repo.clone(), Arc::new(Sha256Digest));
        let gate = CredentialGate::new(repo, CredentialGateConfig::default());

        let user = accounts.register("alice", "Alice", "old").await.unwrap();
        let (_, version) = accounts.login("alice", "old").await.unwrap();
        let old_session = session(&user.user_id, version);
        assert!(gate.check(Some(&old_session)).await.is_ok());

        accounts.update_password(&user.user_id, "old", "new").await.unwrap();

        let err = gate.check(Some(&old_session)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
        assert_eq!(err.message, "Credential has changed, please login again");

        let (_, version) = accounts.login("alice", "new").await.unwrap();
        assert!(gate.check(Some(&session(&user.user_id, version))).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let gate = CredentialGate::new(
            Arc::new(MemoryCredentialRepository::new()),
            CredentialGateConfig::default(),
        );

        assert_eq!(gate.check(None).await.unwrap_err().code, ErrorCode::Unauthorized);
        assert_eq!(
            gate.check(Some(&session("", 0))).await.unwrap_err().code,
            ErrorCode::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_unknown_user_is_session_expired() {
        let gate = CredentialGate::new(
            Arc::new(MemoryCredentialRepository::new()),
            CredentialGateConfig::default(),
        );

        let err = gate.check(Some(&session("ghost", 0))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
        assert_eq!(err.message, "User not found");
    }

    #[tokio::test]
    async fn test_lookup_failure_policy() {
        let open = CredentialGate::new(Arc::new(BrokenRepository), CredentialGateConfig::default());
        assert!(open.check(Some(&session("u1", 0))).await.is_ok());

        let closed = CredentialGate::new(
            Arc::new(BrokenRepository),
            CredentialGateConfig {
                fail_open_on_lookup_error: false,
            },
        );
        assert_eq!(
            closed.check(Some(&session("u1", 0))).await.unwrap_err().code,
            ErrorCode::ServerError
        );
    }
}
