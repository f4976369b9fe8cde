use std::path::PathBuf;

use crate::config::{Config, KeySourceKind};
use color_eyre::Result;
use dirs::data_dir;
use fieldseal_core::FieldVault;
use fieldseal_storage::{
    file_token_store::FileTokenStore,
    key_source::{vault_from_source, EnvKeySource, KeyringKeySource, MasterKeySource},
};
use tracing::debug;

const KEYRING_SERVICE: &str = "fieldseal";
const KEYRING_ACCOUNT: &str = "master-key";

/// Resolve the default data directory for fieldseal.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("fieldseal"))
}

/// Pick the master key source named by the config (environment by default).
pub fn key_source_from_config(config: &Config) -> Box<dyn MasterKeySource> {
    let key = config.key.clone().unwrap_or_default();
    match key.source {
        KeySourceKind::Env => match key.env_var {
            Some(var) => Box::new(EnvKeySource::new(var)),
            None => Box::new(EnvKeySource::default()),
        },
        KeySourceKind::Keyring => Box::new(keyring_source_from_config(config)),
    }
}

/// Keyring entry named by the config, whether or not it is the active source.
pub fn keyring_source_from_config(config: &Config) -> KeyringKeySource {
    let key = config.key.clone().unwrap_or_default();
    KeyringKeySource::new(
        key.keyring_service
            .unwrap_or_else(|| KEYRING_SERVICE.to_string()),
        key.keyring_account
            .unwrap_or_else(|| KEYRING_ACCOUNT.to_string()),
    )
}

/// Load the master key once and bind it into a vault. Fails before any
/// encryption happens when the key is missing or malformed.
pub fn vault_from_config(config: &Config) -> Result<FieldVault> {
    let source = key_source_from_config(config);
    Ok(vault_from_source(source.as_ref())?)
}

/// Vault for an outgoing key named by environment variable (rotation).
pub fn vault_from_env(var: &str) -> Result<FieldVault> {
    Ok(vault_from_source(&EnvKeySource::new(var))?)
}

/// Build the token store, honoring a `data_dir` override.
pub fn store_from_config(config: &Config) -> Result<FileTokenStore> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "initializing token store");
    Ok(FileTokenStore::new(root))
}
