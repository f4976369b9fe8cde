use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by token store implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Requested key does not exist.
    #[error("entry not found for key: {key}")]
    NotFound { key: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Persistence contract for envelope tokens. Tokens are opaque text; stores
/// never see plaintext or keys.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a token under a key, overwriting any existing entry.
    async fn put(&self, key: &str, token: &str) -> Result<(), StoreError>;

    /// Retrieve the token for a key.
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Remove a key and its token (idempotent).
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory token store for tests and smoke runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put(&self, key: &str, token: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.insert(key.to_string(), token.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        map.get(key).cloned().ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_get_returns_latest() {
        let store = InMemoryTokenStore::new();
        store.put("profile/1", "first").await.expect("put should succeed");
        store.put("profile/1", "second").await.expect("put should succeed");

        let token = store.get("profile/1").await.expect("get should succeed");
        assert_eq!(token, "second");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_removes_data() {
        let store = InMemoryTokenStore::new();
        store.put("k", "v").await.expect("put should succeed");
        store.delete("k").await.expect("delete should succeed");
        store
            .delete("k")
            .await
            .expect("delete again should still succeed");

        let err = store
            .get("k")
            .await
            .expect_err("get should fail after delete");
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.is_empty());
    }
}
