use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "fieldseal",
    about = "Authenticated field encryption for data at rest",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate a new master key (base64) for ENCRYPTION_KEY.
    Keygen {
        /// Store the key in the configured OS keyring entry instead of printing it.
        #[arg(long)]
        store_keyring: bool,
    },
    /// Encrypt a value into an envelope token.
    Encrypt {
        /// Treat the value as JSON instead of raw text.
        #[arg(long)]
        json: bool,
        /// Value to encrypt; read from stdin when omitted.
        value: Option<String>,
    },
    /// Decrypt an envelope token.
    Decrypt {
        /// Token to decrypt; read from stdin when omitted.
        token: Option<String>,
    },
    /// Print the SHA-256 fingerprint of a value.
    Hash {
        #[arg(long)]
        json: bool,
        value: Option<String>,
    },
    /// Derive or verify password verifiers.
    #[command(subcommand)]
    Password(PasswordCommand),
    /// Manage encrypted user profiles.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Re-encrypt a token from an outgoing key to the current key.
    Rotate {
        #[command(flatten)]
        from: PreviousKey,
        token: Option<String>,
    },
    /// Round-trip a sample value through the configured key and store.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PasswordCommand {
    /// Derive a hash; a fresh salt is generated unless one is given.
    Hash {
        /// Read from stdin when omitted, keeping it out of shell history.
        password: Option<String>,
        #[arg(long)]
        salt: Option<String>,
    },
    /// Check a password against a stored hash and salt.
    Verify {
        password: Option<String>,
        #[arg(long)]
        hash: String,
        #[arg(long)]
        salt: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    /// Seal a JSON profile object for a user.
    Put {
        user: String,
        /// Profile JSON; read from stdin when omitted.
        profile: Option<String>,
    },
    /// Print a user's decrypted profile.
    Get { user: String },
    /// Remove a user's profile.
    Delete { user: String },
    /// Re-seal stored profiles from an outgoing key to the current key.
    Rotate {
        #[command(flatten)]
        from: PreviousKey,
        #[arg(required = true)]
        users: Vec<String>,
    },
}

/// Where the outgoing master key is read from during rotation.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PreviousKey {
    /// Environment variable holding the outgoing master key.
    #[arg(long = "from-env", value_name = "VAR")]
    pub var: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_encrypt_with_json_flag() {
        let cli = Cli::try_parse_from(["fieldseal", "encrypt", "--json", "{\"a\":1}"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Encrypt {
                json: true,
                value: Some("{\"a\":1}".into())
            }
        );
    }

    #[test]
    fn decrypt_token_is_optional() {
        let cli = Cli::try_parse_from(["fieldseal", "decrypt"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Decrypt { token: None });
    }

    #[test]
    fn parses_password_verify() {
        let cli = Cli::try_parse_from([
            "fieldseal", "password", "verify", "pw", "--hash", "h", "--salt", "s",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Password(PasswordCommand::Verify {
                password: Some("pw".into()),
                hash: "h".into(),
                salt: "s".into(),
            })
        );
    }

    #[test]
    fn secrets_can_be_left_off_the_command_line() {
        let cli = Cli::try_parse_from(["fieldseal", "password", "hash"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Password(PasswordCommand::Hash {
                password: None,
                salt: None
            })
        );

        let cli = Cli::try_parse_from([
            "fieldseal", "password", "verify", "--hash", "h", "--salt", "s",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Password(PasswordCommand::Verify {
                password: None,
                hash: "h".into(),
                salt: "s".into(),
            })
        );

        let cli = Cli::try_parse_from(["fieldseal", "profile", "put", "u1"])
            .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Profile(ProfileCommand::Put {
                user: "u1".into(),
                profile: None
            })
        );
    }

    #[test]
    fn keygen_prints_unless_asked_to_store() {
        let cli = Cli::try_parse_from(["fieldseal", "keygen"]).expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Keygen {
                store_keyring: false
            }
        );
        let cli = Cli::try_parse_from(["fieldseal", "keygen", "--store-keyring"])
            .expect("parse should succeed");
        assert_eq!(cli.command, Command::Keygen { store_keyring: true });
    }

    #[test]
    fn profile_rotate_requires_users() {
        assert!(
            Cli::try_parse_from(["fieldseal", "profile", "rotate", "--from-env", "OLD_KEY"])
                .is_err()
        );
        let cli = Cli::try_parse_from([
            "fieldseal", "profile", "rotate", "--from-env", "OLD_KEY", "u1", "u2",
        ])
        .expect("parse should succeed");
        assert_eq!(
            cli.command,
            Command::Profile(ProfileCommand::Rotate {
                from: PreviousKey {
                    var: "OLD_KEY".into()
                },
                users: vec!["u1".into(), "u2".into()],
            })
        );
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli =
            Cli::try_parse_from(["fieldseal", "config", "init"]).expect("parse should succeed");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["fieldseal"]).is_err());
    }
}
