use std::{
    env,
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/fieldseal/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the token store directory.
    pub data_dir: Option<PathBuf>,
    /// Where the master key comes from.
    pub key: Option<KeyConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeySourceKind {
    #[default]
    Env,
    Keyring,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct KeyConfig {
    #[serde(default)]
    pub source: KeySourceKind,
    /// Variable name for the env source (defaults to `ENCRYPTION_KEY`).
    pub env_var: Option<String>,
    pub keyring_service: Option<String>,
    pub keyring_account: Option<String>,
}

/// Environment override for the config file location.
pub const CONFIG_PATH_VAR: &str = "FIELDSEAL_CONFIG";

/// Load config from `FIELDSEAL_CONFIG` or the platform config dir.
pub fn load() -> Result<Config> {
    load_from_path(default_path()?)
}

/// Parse the config at `path`. An absent or blank file yields defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let contents = match fs::read_to_string(path.as_ref()) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(err.into()),
    };
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(toml::from_str(&contents)?)
}

pub fn default_path() -> Result<PathBuf> {
    resolve_path(env::var_os(CONFIG_PATH_VAR), config_dir())
}

fn resolve_path(explicit: Option<OsString>, base: Option<PathBuf>) -> Result<PathBuf> {
    match (explicit, base) {
        (Some(path), _) if !path.is_empty() => Ok(PathBuf::from(path)),
        (_, Some(base)) => Ok(base.join("fieldseal").join("config.toml")),
        _ => Err(color_eyre::eyre::eyre!(
            "no config dir available; set {CONFIG_PATH_VAR}"
        )),
    }
}

/// Write the config to the default path unless a file already exists there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_to_path_if_missing(config, &default_path()?)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
