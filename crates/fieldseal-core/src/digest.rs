use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::{error::EncryptionError, payload::Payload};

/// SHA-256 fingerprint of a payload's canonical bytes, base64 encoded.
/// Integrity comparison only; it offers no confidentiality.
pub fn hash(value: &Payload) -> Result<String, EncryptionError> {
    let bytes = value.canonical_bytes()?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_text(value: &str) -> String {
    hash_bytes(value.as_bytes())
}

fn hash_bytes(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(Sha256::digest(bytes))
}
