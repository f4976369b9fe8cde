//! Core of fieldseal: authenticated field encryption at rest.
//! PBKDF2-derived per-call keys, AES-256-GCM envelopes, digests and password
//! verifiers. Persistence is expressed only as the `TokenStore` contract.

pub mod digest;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod key;
pub mod payload;
pub mod storage;
pub mod vault;

pub use digest::{hash, hash_text};
pub use envelope::{Envelope, PayloadKind};
pub use error::{ConfigurationError, DecryptionError, EncryptionError, PasswordError};
pub use kdf::{derive_key_from_password, verify_password, PasswordHash};
pub use key::{generate_master_key, MasterKey};
pub use payload::Payload;
pub use vault::{decrypt, encrypt, FieldVault, ReencryptError};
