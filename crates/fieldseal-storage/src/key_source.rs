use std::sync::{Arc, Mutex};

use fieldseal_core::{ConfigurationError, FieldVault, MasterKey};
use tracing::{debug, info};

/// Environment variable holding the deployment master key.
pub const DEFAULT_KEY_VAR: &str = "ENCRYPTION_KEY";

/// Provides the deployment master key, read once at process start.
pub trait MasterKeySource: Send + Sync {
    /// Short label for logs; never includes key material.
    fn describe(&self) -> String;

    fn load(&self) -> Result<MasterKey, ConfigurationError>;
}

/// Build a vault from a source, failing fast when no usable key exists.
pub fn vault_from_source(source: &dyn MasterKeySource) -> Result<FieldVault, ConfigurationError> {
    let key = source.load()?;
    debug!(source = %source.describe(), "master key loaded");
    Ok(FieldVault::new(key))
}

/// Reads a base64 master key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvKeySource {
    var: String,
}

impl EnvKeySource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    fn parse(&self, value: Option<String>) -> Result<MasterKey, ConfigurationError> {
        match value {
            Some(raw) if !raw.trim().is_empty() => MasterKey::from_base64(&raw),
            _ => Err(ConfigurationError::MissingKey {
                var: self.var.clone(),
            }),
        }
    }
}

impl Default for EnvKeySource {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_VAR)
    }
}

impl MasterKeySource for EnvKeySource {
    fn describe(&self) -> String {
        format!("env:{}", self.var)
    }

    fn load(&self) -> Result<MasterKey, ConfigurationError> {
        self.parse(std::env::var(&self.var).ok())
    }
}

/// OS keyring-backed source. Only [`KeyringKeySource::create`] writes a key;
/// `load` never invents one.
pub struct KeyringKeySource {
    service: String,
    account: String,
}

impl KeyringKeySource {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, ConfigurationError> {
        keyring::Entry::new(&self.service, &self.account).map_err(keyring_err)
    }

    /// Generate a master key and store it. Refuses to replace an existing
    /// entry: tokens sealed under it would become unreadable.
    pub fn create(&self) -> Result<MasterKey, ConfigurationError> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(_) => Err(ConfigurationError::Source {
                reason: format!("{} already holds a master key", self.describe()),
            }),
            Err(keyring::Error::NoEntry) => {
                let key = MasterKey::generate();
                entry.set_password(&key.to_base64()).map_err(keyring_err)?;
                info!(service = %self.service, account = %self.account, "stored new master key in keyring");
                Ok(key)
            }
            Err(err) => Err(keyring_err(err)),
        }
    }

    fn parse(&self, lookup: Result<String, keyring::Error>) -> Result<MasterKey, ConfigurationError> {
        match lookup {
            Ok(secret) => MasterKey::from_base64(&secret),
            Err(keyring::Error::NoEntry) => Err(ConfigurationError::MissingKey {
                var: self.describe(),
            }),
            Err(err) => Err(keyring_err(err)),
        }
    }
}

impl MasterKeySource for KeyringKeySource {
    fn describe(&self) -> String {
        format!("keyring:{}/{}", self.service, self.account)
    }

    fn load(&self) -> Result<MasterKey, ConfigurationError> {
        self.parse(self.entry()?.get_password())
    }
}

fn keyring_err(err: keyring::Error) -> ConfigurationError {
    ConfigurationError::Source {
        reason: format!("keyring: {err}"),
    }
}

/// In-memory source for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeySource {
    inner: Arc<Mutex<Option<MasterKey>>>,
}

impl InMemoryKeySource {
    pub fn with_key(key: MasterKey) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(key))),
        }
    }
}

impl MasterKeySource for InMemoryKeySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<MasterKey, ConfigurationError> {
        let mut guard = self.inner.lock().map_err(|err| ConfigurationError::Source {
            reason: format!("lock poisoned: {err}"),
        })?;

        Ok(guard.get_or_insert_with(MasterKey::generate).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_returns_same_key() {
        let source = InMemoryKeySource::default();
        let first = source.load().unwrap();
        let second = source.load().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_or_empty_env_value_is_a_configuration_error() {
        let source = EnvKeySource::new("FIELDSEAL_TEST_KEY");
        assert_eq!(
            source.parse(None),
            Err(ConfigurationError::MissingKey {
                var: "FIELDSEAL_TEST_KEY".into()
            })
        );
        assert!(matches!(
            source.parse(Some("  ".into())),
            Err(ConfigurationError::MissingKey { .. })
        ));
    }

    #[test]
    fn env_value_must_be_a_32_byte_key() {
        let source = EnvKeySource::default();
        assert!(matches!(
            source.parse(Some("default-key-change-in-production".into())),
            Err(ConfigurationError::MalformedKey { .. })
        ));

        let key = MasterKey::generate();
        assert_eq!(source.parse(Some(key.to_base64())).unwrap(), key);
    }

    #[test]
    fn unset_variable_prevents_vault_construction() {
        let source = EnvKeySource::new("FIELDSEAL_TEST_KEY_THAT_IS_NEVER_SET");
        let err = vault_from_source(&source).expect_err("no key configured");
        assert!(matches!(err, ConfigurationError::MissingKey { .. }));
    }

    #[test]
    fn missing_keyring_entry_is_a_configuration_error() {
        let source = KeyringKeySource::new("fieldseal-test", "master-key");
        assert_eq!(
            source.parse(Err(keyring::Error::NoEntry)),
            Err(ConfigurationError::MissingKey {
                var: "keyring:fieldseal-test/master-key".into()
            })
        );
    }

    #[test]
    fn keyring_load_never_generates_a_key() {
        // Whatever backend is present, an entry nobody created must not load.
        let source = KeyringKeySource::new("fieldseal-test-never-created", "master-key");
        assert!(matches!(
            source.load(),
            Err(ConfigurationError::MissingKey { .. } | ConfigurationError::Source { .. })
        ));
    }

    #[test]
    fn stored_keyring_secret_is_parsed_and_validated() {
        let source = KeyringKeySource::new("fieldseal-test", "master-key");
        let key = MasterKey::generate();
        assert_eq!(source.parse(Ok(key.to_base64())).unwrap(), key);
        assert!(matches!(
            source.parse(Ok("short".into())),
            Err(ConfigurationError::MalformedKey { .. })
        ));
        assert!(matches!(
            source.parse(Err(keyring::Error::NoStorageAccess(
                std::io::Error::other("locked").into()
            ))),
            Err(ConfigurationError::Source { .. })
        ));
    }

    #[test]
    fn describe_never_contains_key_material() {
        let key = MasterKey::generate();
        let source = InMemoryKeySource::with_key(key.clone());
        assert!(!source.describe().contains(&key.to_base64()));
        assert_eq!(EnvKeySource::default().describe(), "env:ENCRYPTION_KEY");
    }
}
