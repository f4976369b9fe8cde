use serde::Serialize;
use serde_json::Value;

use crate::{envelope::PayloadKind, error::EncryptionError};

/// Value carried inside an envelope. The variant is recorded in the envelope
/// header, so decryption never has to guess.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Serialize any value into a JSON payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, EncryptionError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|_| EncryptionError::Serialize)
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Text(_) => PayloadKind::Text,
            Self::Json(_) => PayloadKind::Json,
        }
    }

    /// Canonical bytes: raw UTF-8 for text, compact JSON for structured values.
    /// serde_json keeps object keys sorted, so equal values serialize equally.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, EncryptionError> {
        match self {
            Self::Text(text) => Ok(text.as_bytes().to_vec()),
            Self::Json(value) => serde_json::to_vec(value).map_err(|_| EncryptionError::Serialize),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_canonical_bytes_ignore_insertion_order() {
        let a = Payload::Json(json!({"plan": "pro", "email": "a@example.com"}));
        let b = Payload::Json(json!({"email": "a@example.com", "plan": "pro"}));
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn text_is_not_json_encoded() {
        let payload = Payload::text("hello");
        assert_eq!(payload.canonical_bytes().unwrap(), b"hello");
        assert_eq!(payload.kind(), PayloadKind::Text);
    }

    #[test]
    fn json_string_is_distinct_from_text() {
        let payload = Payload::json("hello").expect("serialize");
        assert_eq!(payload.kind(), PayloadKind::Json);
        assert_eq!(payload.canonical_bytes().unwrap(), b"\"hello\"");
    }
}
