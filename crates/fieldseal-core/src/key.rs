use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ConfigurationError;

/// Length of the deployment master key in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// Long-lived deployment secret. Only ever used as PBKDF2 input.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; MASTER_KEY_LEN],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Parse the textual form: standard base64 of exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigurationError> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return Err(ConfigurationError::MalformedKey {
                reason: "empty".to_string(),
            });
        }

        let mut decoded =
            general_purpose::STANDARD
                .decode(trimmed)
                .map_err(|_| ConfigurationError::MalformedKey {
                    reason: "not valid base64".to_string(),
                })?;

        if decoded.len() != MASTER_KEY_LEN {
            let len = decoded.len();
            decoded.zeroize();
            return Err(ConfigurationError::MalformedKey {
                reason: format!("expected {MASTER_KEY_LEN} bytes, got {len}"),
            });
        }

        let mut bytes = [0u8; MASTER_KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { bytes })
    }

    /// Fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; MASTER_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.as_slice().ct_eq(other.bytes.as_slice()).into()
    }
}

impl Eq for MasterKey {}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}

/// Generate a new master key in its textual form, suitable for `ENCRYPTION_KEY`.
pub fn generate_master_key() -> String {
    MasterKey::generate().to_base64()
}
