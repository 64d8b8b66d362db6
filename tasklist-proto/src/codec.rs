//! JSON encoding for values held in the durable store.
//!
//! The store only holds strings, so every typed value goes through
//! [`encode`] on the way in and [`decode`] on the way out. The task
//! collection is stored as a plain JSON array of [`Task`](crate::task::Task)
//! objects with no envelope or version field.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The stored text is not valid JSON for the requested type.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

/// Encodes a value as compact JSON text.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a value from JSON text.
///
/// # Errors
///
/// Returns `CodecError::Deserialization` if the text is malformed or does
/// not match the shape of `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Deserialization(e.to_string()))
}
