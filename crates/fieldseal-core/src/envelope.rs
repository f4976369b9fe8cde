//! Envelope wire format.
//!
//! ```text
//!  0..1   version  0x01
//!  1..2   kind     0x00 text | 0x01 json
//!  2..18  salt     16 bytes (random, per encryption)
//! 18..30  nonce    12 bytes (random, per encryption)
//! 30..    ciphertext + 16-byte GCM tag
//! ```
//!
//! The whole header (`0..30`) is authenticated as associated data. The binary
//! form is carried as a single standard base64 token.

use base64::{engine::general_purpose, Engine as _};

use crate::error::DecryptionError;

/// Current envelope version. Bump when the format changes.
pub const VERSION: u8 = 0x01;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const HEADER_LEN: usize = 2 + SALT_LEN + NONCE_LEN; // 30
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + TAG_LEN; // 46

/// Explicit type tag for the sealed plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Json,
}

impl PayloadKind {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Text => 0x00,
            Self::Json => 0x01,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, DecryptionError> {
        match byte {
            0x00 => Ok(Self::Text),
            0x01 => Ok(Self::Json),
            other => Err(DecryptionError::UnknownPayloadKind(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// One sealed value. `sealed` holds ciphertext with the tag appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u8,
    pub kind: PayloadKind,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub sealed: Vec<u8>,
}

impl Envelope {
    /// Header bytes bound into the tag as associated data.
    pub fn header(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0] = self.version;
        header[1] = self.kind.as_byte();
        header[2..2 + SALT_LEN].copy_from_slice(&self.salt);
        header[2 + SALT_LEN..].copy_from_slice(&self.nonce);
        header
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.sealed.len());
        out.extend_from_slice(&self.header());
        out.extend_from_slice(&self.sealed);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecryptionError> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(DecryptionError::Truncated { len: bytes.len() });
        }

        let version = bytes[0];
        if version != VERSION {
            return Err(DecryptionError::UnsupportedVersion(version));
        }
        let kind = PayloadKind::from_byte(bytes[1])?;

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[2..2 + SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[2 + SALT_LEN..HEADER_LEN]);

        Ok(Self {
            version,
            kind,
            salt,
            nonce,
            sealed: bytes[HEADER_LEN..].to_vec(),
        })
    }

    pub fn encode(&self) -> String {
        general_purpose::STANDARD.encode(self.to_bytes())
    }

    pub fn decode(token: &str) -> Result<Self, DecryptionError> {
        let bytes = general_purpose::STANDARD
            .decode(token.trim())
            .map_err(|_| DecryptionError::Encoding)?;
        Self::from_bytes(&bytes)
    }
}
