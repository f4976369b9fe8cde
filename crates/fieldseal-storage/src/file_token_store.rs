use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use fieldseal_core::storage::{StoreError, TokenStore};
use tempfile::NamedTempFile;
use tracing::instrument;

/// File-backed token store: one file per key, holding the envelope token as
/// text. Writes go through a temp file and an atomic rename.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    root: PathBuf,
}

impl FileTokenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    #[instrument(skip_all, fields(key = %key))]
    async fn put(&self, key: &str, token: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(storage_err)?;
        write_token(&self.path_for(key), token)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(token) => Ok(token.trim().to_string()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(err) => Err(storage_err(err)),
        }
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_err(err)),
        }
    }
}

fn write_token(path: &Path, token: &str) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Storage {
        reason: "invalid storage path".to_string(),
    })?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(token.as_bytes()).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn sanitize_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("tokens"));

        store.put("users/42", "AQAB...").await.expect("put");
        assert_eq!(store.get("users/42").await.expect("get"), "AQAB...");

        // key names are encoded, never used as raw paths
        let entries: Vec<_> = fs::read_dir(store.root())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(sanitize_key("users/42"))]);
    }

    #[tokio::test]
    async fn put_overwrites_existing_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path());
        store.put("k", "old").await.expect("put");
        store.put("k", "new").await.expect("put");
        assert_eq!(store.get("k").await.expect("get"), "new");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path());
        store.put("k", "v").await.expect("put");
        store.delete("k").await.expect("delete");
        store.delete("k").await.expect("delete again");

        let err = store.get("k").await.expect_err("should be missing");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
