use thiserror::Error;

/// Master key missing or unusable. Fatal: no vault can be built without a key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("master key not configured (set {var})")]
    MissingKey { var: String },
    #[error("master key is malformed: {reason}")]
    MalformedKey { reason: String },
    #[error("master key source unavailable: {reason}")]
    Source { reason: String },
}

/// Failure while serializing or sealing a payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("payload serialization failed")]
    Serialize,
    #[error("AEAD seal failed")]
    Seal,
}

/// Failure while opening an envelope. Never transient: retrying with the
/// same inputs fails the same way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("envelope is not valid base64")]
    Encoding,
    #[error("envelope too short: {len} bytes")]
    Truncated { len: usize },
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown payload kind {0}")]
    UnknownPayloadKind(u8),
    #[error("authentication failed (wrong key or corrupted envelope)")]
    Authentication,
    #[error("decrypted payload is not valid UTF-8")]
    Utf8,
    #[error("decrypted payload does not match the expected shape")]
    Decode,
}

/// Failure while deriving a password verifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("salt is not valid base64")]
    InvalidSalt,
}
