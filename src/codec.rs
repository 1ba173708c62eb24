//! Value codecs
//!
//! Converts member / key / value payloads to and from bytes. A collection
//! binds one codec instance when it is constructed.
//!
//! Order-significant numeric key segments never go through a codec; they
//! use the fixed-width encodings in [`crate::keys`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Pluggable payload serializer
pub trait Codec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// Compact binary payloads (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Human-readable JSON payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
