//! Account operations on top of a [`CredentialRepository`].

use super::{
    errors::{CredentialError, CredentialResult},
    models::{Credential, User},
    repository::CredentialRepository,
};
use crate::digest::PasswordDigest;
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

const SALT_LEN: usize = 32;

fn new_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

/// Registration, login and credential management
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn CredentialRepository>,
    digest: Arc<dyn PasswordDigest>,
}

impl AccountService {
    /// Create a new account service
    ///
    /// # Arguments
    ///
    /// * `repository` - Account storage
    /// * `digest` - Password hashing function
    pub fn new(repository: Arc<dyn CredentialRepository>, digest: Arc<dyn PasswordDigest>) -> Self {
        Self { repository, digest }
    }

    pub fn repository(&self) -> &Arc<dyn CredentialRepository> {
        &self.repository
    }

    fn verify(&self, credential: &Credential, password: &str) -> CredentialResult<bool> {
        let hash = self.digest.digest(&credential.password_salt, password)?;
        Ok(hash.as_bytes().ct_eq(credential.password_hash.as_bytes()).into())
    }

    /// Register a new account with credential version 0
    ///
    /// # Errors
    ///
    /// * `CredentialError::UserNameDuplicated` - Account already exists
    pub async fn register(&self, account: &str, name: &str, password: &str) -> CredentialResult<User> {
        if self.repository.find_by_account(account).await?.is_some() {
            log::info!("User name duplicated: {}", account);
            return Err(CredentialError::UserNameDuplicated);
        }

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4().to_string(),
            account: account.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        let salt = new_salt();
        let credential = Credential {
            user_id: user.user_id.clone(),
            password_hash: self.digest.digest(&salt, password)?,
            password_salt: salt,
            credential_version: 0,
        };

        self.repository.create_user(&user, &credential).await?;
        Ok(user)
    }

    /// Check a password and return the user with its current credential version
    ///
    /// # Errors
    ///
    /// * `CredentialError::UserNotExist` - Unknown account
    /// * `CredentialError::PasswordIncorrect` - Wrong password
    /// * `CredentialError::Inconsistent` - Account has no credential
    pub async fn login(&self, account: &str, password: &str) -> CredentialResult<(User, i64)> {
        let user = self
            .repository
            .find_by_account(account)
            .await?
            .ok_or(CredentialError::UserNotExist)?;

        let credential = self
            .repository
            .find_credential(&user.user_id)
            .await?
            .ok_or_else(|| {
                CredentialError::Inconsistent(format!("credential not found for {}", user.user_id))
            })?;

        if !self.verify(&credential, password)? {
            log::info!("Password incorrect for user {}", user.user_id);
            return Err(CredentialError::PasswordIncorrect);
        }

        Ok((user, credential.credential_version))
    }

    pub async fn get_by_user_id(&self, user_id: &str) -> CredentialResult<User> {
        self.repository
            .find_by_user_id(user_id)
            .await?
            .ok_or(CredentialError::UserNotExist)
    }

    /// Current credential version of a user
    pub async fn credential_version(&self, user_id: &str) -> CredentialResult<i64> {
        self.repository
            .find_credential(user_id)
            .await?
            .map(|c| c.credential_version)
            .ok_or(CredentialError::UserNotExist)
    }

    /// Replace the password after checking the old one. Bumps the credential
    /// version, which invalidates every session created before the change.
    ///
    /// # Errors
    ///
    /// * `CredentialError::PasswordIncorrect` - Old password wrong
    /// * `CredentialError::VersionConflict` - Another change won the race
    pub async fn update_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> CredentialResult<i64> {
        if self.repository.find_by_user_id(user_id).await?.is_none() {
            return Err(CredentialError::UserNotExist);
        }

        let current = self.repository.find_credential(user_id).await?.ok_or_else(|| {
            CredentialError::Inconsistent(format!("credential not found for {}", user_id))
        })?;

        if !self.verify(&current, old_password)? {
            return Err(CredentialError::PasswordIncorrect);
        }

        let salt = new_salt();
        let next = Credential {
            user_id: user_id.to_string(),
            password_hash: self.digest.digest(&salt, new_password)?,
            password_salt: salt,
            credential_version: current.credential_version + 1,
        };

        if !self
            .repository
            .update_credential(current.credential_version, &next)
            .await?
        {
            return Err(CredentialError::VersionConflict);
        }

        Ok(next.credential_version)
    }

    pub async fn update_info(&self, user_id: &str, name: &str) -> CredentialResult<()> {
        if self.repository.update_name(user_id, name).await? {
            Ok(())
        } else {
            Err(CredentialError::UserNotExist)
        }
    }
}
