//! Persisted client state: the signed session token and the user-id
//! reference, each independently readable and clearable.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tower_sessions::Session;

pub const TOKEN_KEY: &str = "access_token";
pub const USER_ID_KEY: &str = "user_id";
pub const FLASH_KEY: &str = "flash";

#[derive(Debug, Error)]
#[error("Client storage error: {0}")]
pub struct StorageError(pub String);

/// String key/value storage scoped to one browser.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Cookie-backed server-side session.
#[async_trait]
impl ClientStorage for Session {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Session::get::<String>(self, key)
            .await
            .map_err(|e| StorageError(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value)
            .await
            .map_err(|e| StorageError(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Session::remove::<String>(self, key)
            .await
            .map(|_| ())
            .map_err(|e| StorageError(e.to_string()))
    }
}

/// Process-local storage, for tests and tooling.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ClientStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Typed access to the token and user-id entries.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn ClientStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    pub async fn token(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(TOKEN_KEY).await
    }

    pub async fn has_token(&self) -> bool {
        matches!(self.token().await, Ok(Some(_)))
    }

    pub async fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token).await
    }

    pub async fn remove_token(&self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_KEY).await
    }

    pub async fn user_id(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(USER_ID_KEY).await
    }

    pub async fn set_user_id(&self, user_id: &str) -> Result<(), StorageError> {
        self.storage.set(USER_ID_KEY, user_id).await
    }

    /// Write both entries of a fresh login.
    pub async fn persist(&self, token: &str, user_id: &str) -> Result<(), StorageError> {
        self.set_token(token).await?;
        self.set_user_id(user_id).await
    }

    /// Leave a message for the next view that asks for one.
    pub async fn set_flash(&self, message: &str) -> Result<(), StorageError> {
        self.storage.set(FLASH_KEY, message).await
    }

    /// Read and remove the pending message.
    pub async fn take_flash(&self) -> Result<Option<String>, StorageError> {
        let message = self.storage.get(FLASH_KEY).await?;
        if message.is_some() {
            self.storage.remove(FLASH_KEY).await?;
        }
        Ok(message)
    }

    /// Remove both entries. Both removals are attempted even if the first fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let token = self.storage.remove(TOKEN_KEY).await;
        let user_id = self.storage.remove(USER_ID_KEY).await;
        token.and(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TokenStore {
        TokenStore::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn persist_then_clear_removes_both_entries() {
        let store = store();
        store.persist("tok", "42").await.unwrap();
        assert!(store.has_token().await);
        assert_eq!(store.user_id().await.unwrap(), Some("42".to_string()));

        store.clear().await.unwrap();
        assert!(!store.has_token().await);
        assert_eq!(store.user_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn flash_is_read_once_and_survives_clear() {
        let store = store();
        store.persist("tok", "42").await.unwrap();
        store.set_flash("Authentication failed").await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(
            store.take_flash().await.unwrap().as_deref(),
            Some("Authentication failed")
        );
        assert_eq!(store.take_flash().await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_are_independent() {
        let store = store();
        store.persist("tok", "42").await.unwrap();
        store.remove_token().await.unwrap();

        assert!(!store.has_token().await);
        assert_eq!(store.user_id().await.unwrap(), Some("42".to_string()));
    }
}
