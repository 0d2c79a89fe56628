//! Server-side sessions kept in the shared store.

use super::errors::AuthResult;
use crate::{config::SessionConfig, store::CounterStore, token::id_gen};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the server remembers about a logged-in session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: String,
    pub account: String,
    pub name: String,
    /// Credential version at login time
    pub credential_version: i64,
}

/// Session persistence under `<key_prefix><session id>`
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn CounterStore>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(store: Arc<dyn CounterStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn key(&self, sess_id: &str) -> String {
        format!("{}{}", self.config.key_prefix, sess_id)
    }

    /// Persist a new session and return its id
    pub async fn create(&self, data: &SessionData) -> AuthResult<String> {
        let sess_id = id_gen::new_id();
        self.save(&sess_id, data).await?;
        Ok(sess_id)
    }

    /// Overwrite the data of an existing session id, restarting its max age
    pub async fn save(&self, sess_id: &str, data: &SessionData) -> AuthResult<()> {
        let value = serde_json::to_string(data)?;
        self.store
            .set(&self.key(sess_id), &value, self.config.max_age)
            .await?;
        Ok(())
    }

    /// Load a live session
    pub async fn load(&self, sess_id: &str) -> AuthResult<Option<SessionData>> {
        if sess_id.is_empty() {
            return Ok(None);
        }
        match self.store.get(&self.key(sess_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Delete a session, returning whether it existed
    pub async fn remove(&self, sess_id: &str) -> AuthResult<bool> {
        Ok(self.store.del(&self.key(sess_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyTtl, MemoryCounterStore};

    fn data() -> SessionData {
        SessionData {
            user_id: "u1".to_string(),
            account: "alice".to_string(),
            name: "Alice".to_string(),
            credential_version: 3,
        }
    }

    #[tokio::test]
    async fn test_create_load_remove() {
        tokio::time::pause();
        let store = Arc::new(MemoryCounterStore::new());
        let sessions = SessionStore::new(store.clone(), SessionConfig::default());

        let id = sessions.create(&data()).await.unwrap();
        assert_eq!(sessions.load(&id).await.unwrap(), Some(data()));
        assert_eq!(
            store.ttl(&format!("auth_session:{}", id)).await.unwrap(),
            KeyTtl::Expires(SessionConfig::default().max_age)
        );

        assert!(sessions.remove(&id).await.unwrap());
        assert_eq!(sessions.load(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_session_expires_after_max_age() {
        tokio::time::pause();
        let sessions = SessionStore::new(Arc::new(MemoryCounterStore::new()), SessionConfig::default());
        let id = sessions.create(&data()).await.unwrap();

        tokio::time::advance(SessionConfig::default().max_age).await;
        assert_eq!(sessions.load(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_or_unknown_id() {
        let sessions = SessionStore::new(Arc::new(MemoryCounterStore::new()), SessionConfig::default());
        assert_eq!(sessions.load("").await.unwrap(), None);
        assert_eq!(sessions.load("nope").await.unwrap(), None);
    }
}
