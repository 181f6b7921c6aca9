//! Pluggable snapshot encoding
//!
//! Durable backends store checkpoints as bytes; [`SerializerProtocol`]
//! abstracts over the encoding so a backend can choose human-readable JSON
//! or compact bincode without changing anything else.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Encoding used when a checkpoint crosses a storage boundary.
pub trait SerializerProtocol: Send + Sync {
    /// Serialize a value to bytes.
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes.
    fn loads<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Short name of the encoding, for diagnostics.
    fn name(&self) -> &'static str;
}

/// Human-readable JSON encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SerializerProtocol for JsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Compact binary encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl SerializerProtocol for BincodeSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn name(&self) -> &'static str {
        "bincode"
    }
}
