//! Serde-backed variable-size serializer.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DiskArrayError, Result};

use super::{Encoded, Serializer};

/// Stores any serde type using bincode's compact encoding
pub struct BincodeSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Serializer<T> for BincodeSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn try_serialize(&self, value: &T, output: &mut [u8]) -> Result<Encoded> {
        let size = bincode::serialized_size(value)
            .map_err(|e| DiskArrayError::Serialization(e.to_string()))? as usize;
        if size > output.len() {
            return Ok(Encoded::BufferTooSmall {
                required: Some(size),
            });
        }

        let mut cursor: &mut [u8] = &mut output[..size];
        bincode::serialize_into(&mut cursor, value)
            .map_err(|e| DiskArrayError::Serialization(e.to_string()))?;
        Ok(Encoded::Written(size))
    }

    fn deserialize(&self, input: &[u8]) -> Result<T> {
        bincode::deserialize(input).map_err(|e| DiskArrayError::Serialization(e.to_string()))
    }
}
