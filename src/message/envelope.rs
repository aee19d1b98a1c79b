use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Headers;

/// Key the headers occupy in the encoded object. Payloads may not use it.
pub const HEADERS_FIELD: &str = "headers";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The payload serializes a field that would be read back as headers.
    #[error("payload field `{0}` is reserved for envelope headers")]
    ReservedField(&'static str),
}

/// A payload plus its headers, as it travels through the store.
///
/// Serializes to one flat JSON object: the payload's own fields next to a
/// `headers` object (omitted when empty). Payload types must therefore
/// serialize as JSON objects without a `headers` field of their own; encoding
/// such a payload fails with [`EncodeError::ReservedField`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            headers: Headers::new(),
            payload,
        }
    }

    /// Add a header to the envelope.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let payload = serde_json::to_value(&self.payload)?;
        if payload.get(HEADERS_FIELD).is_some() {
            return Err(EncodeError::ReservedField(HEADERS_FIELD));
        }
        Ok(serde_json::to_vec(self)?)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl<T> From<T> for Envelope<T> {
    fn from(payload: T) -> Self {
        Envelope::new(payload)
    }
}
