use std::sync::Arc;

use fieldseal_core::{
    storage::{StoreError, TokenStore},
    DecryptionError, EncryptionError, FieldVault, Payload, ReencryptError,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Bookkeeping fields that stay outside the encrypted profile.
pub const UNSEALED_FIELDS: [&str; 3] = ["id", "created_at", "last_login"];

const PROFILE_PREFIX: &str = "profiles/";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile must be a JSON object")]
    NotAnObject,
    #[error(transparent)]
    Encrypt(#[from] EncryptionError),
    #[error(transparent)]
    Decrypt(#[from] DecryptionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("crypto worker failed: {0}")]
    Worker(String),
    /// Rotation halted; the first `completed` profiles already use the new key.
    #[error("re-encryption stopped at profile {user_id} after {completed} rewritten")]
    Rotation {
        completed: usize,
        user_id: String,
        #[source]
        source: Box<ProfileError>,
    },
}

impl From<ReencryptError> for ProfileError {
    fn from(err: ReencryptError) -> Self {
        match err {
            ReencryptError::Decrypt(e) => Self::Decrypt(e),
            ReencryptError::Encrypt(e) => Self::Encrypt(e),
        }
    }
}

/// Encrypted user profiles: sealed with a `FieldVault`, persisted as tokens.
pub struct ProfileRepository<S: TokenStore> {
    vault: FieldVault,
    store: Arc<S>,
}

impl<S: TokenStore> ProfileRepository<S> {
    pub fn new(vault: FieldVault, store: S) -> Self {
        Self {
            vault,
            store: Arc::new(store),
        }
    }

    /// Seal a profile object under `user_id`, replacing any previous one.
    #[instrument(skip(self, profile))]
    pub async fn put(&self, user_id: &str, profile: Value) -> Result<(), ProfileError> {
        let sealed = strip_unsealed(profile)?;
        let vault = self.vault.clone();
        let token = run_blocking(move || vault.encrypt(&Payload::Json(Value::Object(sealed))))
            .await??;
        self.store.put(&profile_key(user_id), &token).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: &str) -> Result<Map<String, Value>, ProfileError> {
        let token = self.store.get(&profile_key(user_id)).await?;
        let vault = self.vault.clone();
        match run_blocking(move || vault.decrypt(&token)).await?? {
            Payload::Json(Value::Object(map)) => Ok(map),
            _ => Err(ProfileError::NotAnObject),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str) -> Result<(), ProfileError> {
        self.store.delete(&profile_key(user_id)).await?;
        Ok(())
    }

    /// Re-seal the listed profiles from `previous` (the outgoing key) to this
    /// repository's key, in order. Stops at the first failure with
    /// [`ProfileError::Rotation`]; profiles before it stay rewritten, so a
    /// rerun should start from the reported user.
    #[instrument(skip_all, fields(count = user_ids.len()))]
    pub async fn reencrypt_from(
        &self,
        previous: &FieldVault,
        user_ids: &[String],
    ) -> Result<usize, ProfileError> {
        for (completed, user_id) in user_ids.iter().enumerate() {
            if let Err(err) = self.reencrypt_one(previous, user_id).await {
                warn!(completed, %user_id, %err, "profile re-encryption stopped");
                return Err(ProfileError::Rotation {
                    completed,
                    user_id: user_id.clone(),
                    source: Box::new(err),
                });
            }
        }
        info!(count = user_ids.len(), "profiles re-encrypted");
        Ok(user_ids.len())
    }

    async fn reencrypt_one(&self, previous: &FieldVault, user_id: &str) -> Result<(), ProfileError> {
        let key = profile_key(user_id);
        let token = self.store.get(&key).await?;
        let (from, to) = (previous.clone(), self.vault.clone());
        let rotated = run_blocking(move || from.reencrypt(&token, &to)).await??;
        self.store.put(&key, &rotated).await?;
        Ok(())
    }
}

fn strip_unsealed(profile: Value) -> Result<Map<String, Value>, ProfileError> {
    let Value::Object(mut map) = profile else {
        return Err(ProfileError::NotAnObject);
    };
    for field in UNSEALED_FIELDS {
        map.remove(field);
    }
    Ok(map)
}

fn profile_key(user_id: &str) -> String {
    format!("{PROFILE_PREFIX}{user_id}")
}

/// PBKDF2 is CPU-bound; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, ProfileError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ProfileError::Worker(err.to_string()))
}
