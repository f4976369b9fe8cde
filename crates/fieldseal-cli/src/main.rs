mod cli;
mod config;
mod keys;

use std::io::{self, Read};

use crate::cli::{Command, ConfigCommand, PasswordCommand, ProfileCommand};
use clap::Parser;
use color_eyre::Result;
use fieldseal_core::{
    derive_key_from_password, generate_master_key, hash, storage::TokenStore, verify_password,
    FieldVault, PasswordHash, Payload,
};
use fieldseal_storage::{key_source::MasterKeySource, profiles::ProfileRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        Command::Keygen { store_keyring } => run_keygen(store_keyring, &config)?,
        Command::Encrypt { json, value } => {
            let vault = keys::vault_from_config(&config)?;
            let value = value_or_stdin(value)?;
            println!("{}", encrypt_value(&vault, json, &value)?);
        }
        Command::Decrypt { token } => {
            let vault = keys::vault_from_config(&config)?;
            let token = value_or_stdin(token)?;
            println!("{}", render_payload(&vault.decrypt(&token)?)?);
        }
        Command::Hash { json, value } => {
            let value = value_or_stdin(value)?;
            println!("{}", hash(&parse_payload(json, &value)?)?);
        }
        Command::Password(cmd) => run_password(cmd)?,
        Command::Profile(cmd) => run_profile(cmd, &config).await?,
        Command::Rotate { from, token } => {
            let previous = keys::vault_from_env(&from.var)?;
            let current = keys::vault_from_config(&config)?;
            let token = value_or_stdin(token)?;
            println!("{}", previous.reencrypt(&token, &current)?);
        }
        Command::Health => run_health_check(&config).await?,
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Logs go to stderr so tokens and digests on stdout stay pipeable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("fieldseal {}", env!("CARGO_PKG_VERSION"));
}

/// Print a fresh key, or create it in the configured keyring entry. The
/// stored key is never echoed.
fn run_keygen(store_keyring: bool, config: &config::Config) -> Result<()> {
    if !store_keyring {
        println!("{}", generate_master_key());
        return Ok(());
    }
    let source = keys::keyring_source_from_config(config);
    source.create()?;
    println!("Stored new master key in {}", source.describe());
    Ok(())
}

fn value_or_stdin(value: Option<String>) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

fn parse_payload(json: bool, value: &str) -> Result<Payload> {
    if json {
        let parsed: serde_json::Value = serde_json::from_str(value)
            .map_err(|e| color_eyre::eyre::eyre!("value is not valid JSON: {e}"))?;
        Ok(Payload::Json(parsed))
    } else {
        Ok(Payload::text(value))
    }
}

fn encrypt_value(vault: &FieldVault, json: bool, value: &str) -> Result<String> {
    Ok(vault.encrypt(&parse_payload(json, value)?)?)
}

fn render_payload(payload: &Payload) -> Result<String> {
    match payload {
        Payload::Text(text) => Ok(text.clone()),
        Payload::Json(value) => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn run_password(cmd: PasswordCommand) -> Result<()> {
    match cmd {
        PasswordCommand::Hash { password, salt } => {
            let password = value_or_stdin(password)?;
            let derived = derive_key_from_password(&password, salt.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&derived)?);
        }
        PasswordCommand::Verify {
            password,
            hash,
            salt,
        } => {
            let password = value_or_stdin(password)?;
            if !verify_password(&password, &PasswordHash { hash, salt }) {
                color_eyre::eyre::bail!("password does not match");
            }
            println!("Password: ok");
        }
    }
    Ok(())
}

async fn run_profile(cmd: ProfileCommand, config: &config::Config) -> Result<()> {
    let vault = keys::vault_from_config(config)?;
    let repo = ProfileRepository::new(vault, keys::store_from_config(config)?);

    match cmd {
        ProfileCommand::Put { user, profile } => {
            let profile = value_or_stdin(profile)?;
            let profile: serde_json::Value = serde_json::from_str(&profile)
                .map_err(|e| color_eyre::eyre::eyre!("profile is not valid JSON: {e}"))?;
            repo.put(&user, profile).await?;
            println!("Stored profile for {user}");
        }
        ProfileCommand::Get { user } => {
            let profile = repo.get(&user).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileCommand::Delete { user } => {
            repo.delete(&user).await?;
            println!("Deleted profile for {user}");
        }
        ProfileCommand::Rotate { from, users } => {
            let previous = keys::vault_from_env(&from.var)?;
            let count = repo.reencrypt_from(&previous, &users).await?;
            println!("Re-encrypted {count} profile(s)");
        }
    }
    Ok(())
}

/// Runs a quick health check of the key and the token store.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let vault = keys::vault_from_config(config)?;
    let store = keys::store_from_config(config)?;
    run_store_health(&vault, &store).await?;
    println!("Key: ok\nStorage: ok");
    Ok(())
}

async fn run_store_health<S: TokenStore>(vault: &FieldVault, store: &S) -> Result<()> {
    let check_key = "health/check";
    let payload = Payload::text("ok");

    let token = vault.encrypt(&payload)?;
    store.put(check_key, &token).await?;
    let stored = store.get(check_key).await?;
    store.delete(check_key).await?;

    if vault.decrypt(&stored)? != payload {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldseal_core::{storage::InMemoryTokenStore, MasterKey};
    use fieldseal_storage::file_token_store::FileTokenStore;

    fn vault() -> FieldVault {
        FieldVault::new(MasterKey::generate())
    }

    #[tokio::test]
    async fn health_check_with_file_store_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path());
        run_store_health(&vault(), &store)
            .await
            .expect("health check should succeed");
    }

    #[tokio::test]
    async fn health_check_leaves_store_empty() {
        let store = InMemoryTokenStore::new();
        run_store_health(&vault(), &store)
            .await
            .expect("health check should succeed");
        assert!(store.is_empty());
    }

    #[test]
    fn json_flag_round_trips_structured_values() {
        let vault = vault();
        let token = encrypt_value(&vault, true, r#"{"plan":"pro"}"#).expect("encrypt");
        let rendered = render_payload(&vault.decrypt(&token).expect("decrypt")).expect("render");
        assert_eq!(rendered, "{\n  \"plan\": \"pro\"\n}");
    }

    #[test]
    fn text_values_are_not_parsed() {
        let vault = vault();
        let token = encrypt_value(&vault, false, r#"{"plan":"pro"}"#).expect("encrypt");
        assert_eq!(
            vault.decrypt(&token).expect("decrypt"),
            Payload::text(r#"{"plan":"pro"}"#)
        );
    }

    #[test]
    fn invalid_json_value_is_rejected() {
        assert!(parse_payload(true, "{not json").is_err());
    }
}
