//! PBKDF2-HMAC-SHA256 key derivation, shared by envelope keys and password
//! verifiers.

use base64::{engine::general_purpose, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroize;

use crate::{envelope::SALT_LEN, error::PasswordError};

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const DERIVED_KEY_LEN: usize = 32;

/// Derives a 256-bit key from `secret` and `salt`. Callers zeroize the result.
pub(crate) fn derive_key(secret: &[u8], salt: &[u8]) -> [u8; DERIVED_KEY_LEN] {
    let mut key = [0u8; DERIVED_KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret, salt, PBKDF2_ITERATIONS, &mut key);
    key
}

pub(crate) fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Password verifier: both fields are base64 and both must be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Derive a verifier for `password`. Without `salt` a fresh 128-bit salt is
/// generated; otherwise the supplied base64 salt is reused.
pub fn derive_key_from_password(
    password: &str,
    salt: Option<&str>,
) -> Result<PasswordHash, PasswordError> {
    let salt_bytes = match salt {
        Some(encoded) => general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| PasswordError::InvalidSalt)?,
        None => random_salt().to_vec(),
    };

    let mut derived = derive_key(password.as_bytes(), &salt_bytes);
    let hash = general_purpose::STANDARD.encode(derived);
    derived.zeroize();

    Ok(PasswordHash {
        hash,
        salt: general_purpose::STANDARD.encode(&salt_bytes),
    })
}

/// Check `password` against a stored verifier. Malformed verifiers never match.
pub fn verify_password(password: &str, stored: &PasswordHash) -> bool {
    let (Ok(salt), Ok(expected)) = (
        general_purpose::STANDARD.decode(stored.salt.trim()),
        general_purpose::STANDARD.decode(stored.hash.trim()),
    ) else {
        debug!("password verifier is not valid base64");
        return false;
    };

    let mut derived = derive_key(password.as_bytes(), &salt);
    let matches: bool = derived.as_slice().ct_eq(expected.as_slice()).into();
    derived.zeroize();
    matches
}
