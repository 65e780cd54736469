//! Payload codecs.
//!
//! The queue stores opaque bytes. A [`Codec`] converts between the caller's
//! value type and those bytes; the default [`RawCodec`] passes bytes through
//! untouched.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Codec error types.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is not valid UTF-8.
    #[error("Payload is not valid UTF-8")]
    InvalidUtf8,

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Codec-specific failure.
    #[error("{0}")]
    Custom(String),
}

/// Two-operation payload encoding contract.
pub trait Codec: Send + Sync + 'static {
    /// In-memory payload type.
    type Value: Send;

    /// Encode a value into stored bytes.
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;

    /// Decode stored bytes back into a value.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError>;
}

/// Transparent byte pass-through.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 text payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    type Value = String;

    fn encode(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

/// JSON payloads for any serde type.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Create a JSON codec.
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
