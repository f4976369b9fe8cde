use aes_gcm::{
    aead::{Aead, KeyInit, Payload as AeadPayload},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};
use zeroize::Zeroize;

use crate::{
    envelope::{Envelope, PayloadKind, NONCE_LEN, VERSION},
    error::{DecryptionError, EncryptionError},
    kdf::{derive_key, random_salt},
    key::MasterKey,
    payload::Payload,
};

/// Seal `value` under a key derived from `master_key` and a fresh salt.
/// Returns the base64 envelope token.
pub fn encrypt(value: &Payload, master_key: &MasterKey) -> Result<String, EncryptionError> {
    let mut plaintext = value.canonical_bytes()?;
    let result = seal(value.kind(), &plaintext, master_key);
    plaintext.zeroize();
    result.map(|envelope| envelope.encode())
}

/// Open a token produced by [`encrypt`]. The tag is verified before any
/// plaintext is produced.
pub fn decrypt(token: &str, master_key: &MasterKey) -> Result<Payload, DecryptionError> {
    let envelope = Envelope::decode(token)?;
    let plaintext = open(&envelope, master_key)?;

    let text = String::from_utf8(plaintext).map_err(|err| {
        err.into_bytes().zeroize();
        DecryptionError::Utf8
    })?;

    match envelope.kind {
        PayloadKind::Text => Ok(Payload::Text(text)),
        PayloadKind::Json => {
            let parsed = serde_json::from_str(&text).map_err(|_| DecryptionError::Decode);
            let mut text = text;
            text.zeroize();
            parsed.map(Payload::Json)
        }
    }
}

fn seal(
    kind: PayloadKind,
    plaintext: &[u8],
    master_key: &MasterKey,
) -> Result<Envelope, EncryptionError> {
    let salt = random_salt();
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut envelope = Envelope {
        version: VERSION,
        kind,
        salt,
        nonce,
        sealed: Vec::new(),
    };

    let mut key = derive_key(master_key.as_bytes(), &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| EncryptionError::Seal);
    key.zeroize();

    let header = envelope.header();
    envelope.sealed = cipher?
        .encrypt(
            Nonce::from_slice(&nonce),
            AeadPayload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|_| EncryptionError::Seal)?;
    Ok(envelope)
}

fn open(envelope: &Envelope, master_key: &MasterKey) -> Result<Vec<u8>, DecryptionError> {
    let mut key = derive_key(master_key.as_bytes(), &envelope.salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| DecryptionError::Authentication);
    key.zeroize();

    let header = envelope.header();
    cipher?
        .decrypt(
            Nonce::from_slice(&envelope.nonce),
            AeadPayload {
                msg: &envelope.sealed,
                aad: &header,
            },
        )
        .map_err(|_| DecryptionError::Authentication)
}

/// EncryptedFieldStore bound to one deployment master key.
///
/// Stateless apart from the immutable key: every call draws its own salt and
/// nonce, so a single vault can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct FieldVault {
    master_key: MasterKey,
}

impl FieldVault {
    pub fn new(master_key: MasterKey) -> Self {
        Self { master_key }
    }

    #[instrument(skip_all, fields(kind = value.kind().as_str()))]
    pub fn encrypt(&self, value: &Payload) -> Result<String, EncryptionError> {
        encrypt(value, &self.master_key).inspect_err(|err| debug!(%err, "seal rejected"))
    }

    #[instrument(skip_all)]
    pub fn decrypt(&self, token: &str) -> Result<Payload, DecryptionError> {
        decrypt(token, &self.master_key).inspect_err(|err| debug!(%err, "envelope rejected"))
    }

    pub fn encrypt_text(&self, value: &str) -> Result<String, EncryptionError> {
        self.encrypt(&Payload::text(value))
    }

    pub fn encrypt_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, EncryptionError> {
        self.encrypt(&Payload::json(value)?)
    }

    /// Decrypt a token that must hold a text payload.
    pub fn decrypt_text(&self, token: &str) -> Result<String, DecryptionError> {
        match self.decrypt(token)? {
            Payload::Text(text) => Ok(text),
            Payload::Json(_) => Err(DecryptionError::Decode),
        }
    }

    /// Decrypt a JSON token into `T`. Shape mismatches report the category
    /// only; serde messages may quote plaintext.
    pub fn decrypt_json<T: DeserializeOwned>(&self, token: &str) -> Result<T, DecryptionError> {
        match self.decrypt(token)? {
            Payload::Json(value) => {
                serde_json::from_value(value).map_err(|_| DecryptionError::Decode)
            }
            Payload::Text(_) => Err(DecryptionError::Decode),
        }
    }

    /// Move a token from this vault's key to `target`'s key. This is the
    /// per-token step of key rotation: decrypt with old, encrypt with new.
    #[instrument(skip_all)]
    pub fn reencrypt(&self, token: &str, target: &FieldVault) -> Result<String, ReencryptError> {
        let payload = self.decrypt(token)?;
        Ok(target.encrypt(&payload)?)
    }
}

/// Either half of a [`FieldVault::reencrypt`] can fail.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ReencryptError {
    #[error(transparent)]
    Decrypt(#[from] DecryptionError),
    #[error(transparent)]
    Encrypt(#[from] EncryptionError),
}
