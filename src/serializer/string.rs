//! String and raw byte serializers.

use crate::error::{DiskArrayError, Result};

use super::{Encoded, FixedSizeSerializer, Serializer};

/// Variable-size UTF-8 strings, stored without terminator
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Serializer;

impl Serializer<String> for Utf8Serializer {
    fn try_serialize(&self, value: &String, output: &mut [u8]) -> Result<Encoded> {
        copy_into(value.as_bytes(), output)
    }

    fn deserialize(&self, input: &[u8]) -> Result<String> {
        String::from_utf8(input.to_vec())
            .map_err(|e| DiskArrayError::Serialization(format!("invalid UTF-8 record: {}", e)))
    }
}

/// Variable-size raw bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesSerializer;

impl Serializer<Vec<u8>> for BytesSerializer {
    fn try_serialize(&self, value: &Vec<u8>, output: &mut [u8]) -> Result<Encoded> {
        copy_into(value, output)
    }

    fn deserialize(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

/// Fixed-width UTF-8 strings, zero padded on the right
///
/// Strings longer than the width, or containing NUL, cannot be stored.
#[derive(Debug, Clone, Copy)]
pub struct PaddedUtf8Serializer {
    width: usize,
}

impl PaddedUtf8Serializer {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Serializer<String> for PaddedUtf8Serializer {
    fn try_serialize(&self, value: &String, output: &mut [u8]) -> Result<Encoded> {
        let bytes = value.as_bytes();
        if bytes.len() > self.width {
            return Err(DiskArrayError::Serialization(format!(
                "string of {} bytes does not fit padded width {}",
                bytes.len(),
                self.width
            )));
        }
        if bytes.contains(&0) {
            return Err(DiskArrayError::Serialization(
                "padded strings cannot contain NUL".to_string(),
            ));
        }
        if output.len() < self.width {
            return Ok(Encoded::BufferTooSmall {
                required: Some(self.width),
            });
        }

        output[..bytes.len()].copy_from_slice(bytes);
        output[bytes.len()..self.width].fill(0);
        Ok(Encoded::Written(self.width))
    }

    fn deserialize(&self, input: &[u8]) -> Result<String> {
        let raw = input.get(..self.width).ok_or_else(|| {
            DiskArrayError::Serialization(format!(
                "expected {} bytes, got {}",
                self.width,
                input.len()
            ))
        })?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8(raw[..end].to_vec())
            .map_err(|e| DiskArrayError::Serialization(format!("invalid UTF-8 record: {}", e)))
    }
}

impl FixedSizeSerializer<String> for PaddedUtf8Serializer {
    fn element_size(&self) -> usize {
        self.width
    }
}

fn copy_into(bytes: &[u8], output: &mut [u8]) -> Result<Encoded> {
    match output.get_mut(..bytes.len()) {
        Some(dst) => {
            dst.copy_from_slice(bytes);
            Ok(Encoded::Written(bytes.len()))
        }
        None => Ok(Encoded::BufferTooSmall {
            required: Some(bytes.len()),
        }),
    }
}
