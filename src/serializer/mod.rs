//! Serializer Module
//!
//! The two contracts the storage engine consumes when turning elements
//! into record bytes and back.
//!
//! ## Contracts
//! - [`Serializer`]: variable-size. Serializes into a caller-provided
//!   buffer and reports either the bytes written or that the buffer was
//!   too small. A too-small attempt must leave nothing the caller relies on.
//! - [`FixedSizeSerializer`]: additionally declares a constant, non-zero
//!   element size. Arrays built with it use the clustered layout.
//!
//! Deserialization always receives the exact byte range of one record.

mod serde_codec;
mod primitive;
mod string;

pub use serde_codec::BincodeSerializer;
pub use primitive::{F64Serializer, I32Serializer, I64Serializer, U32Serializer, U64Serializer};
pub use string::{BytesSerializer, PaddedUtf8Serializer, Utf8Serializer};

use crate::error::Result;

/// Outcome of a serialization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    /// The element was written using this many bytes
    Written(usize),

    /// The output buffer was too small; `required` is a size hint when known
    BufferTooSmall { required: Option<usize> },
}

/// Variable-size serializer contract
pub trait Serializer<T>: Send + Sync {
    /// Serialize `value` into the start of `output`
    fn try_serialize(&self, value: &T, output: &mut [u8]) -> Result<Encoded>;

    /// Deserialize one element from exactly the bytes of its record
    fn deserialize(&self, input: &[u8]) -> Result<T>;
}

/// Fixed-size serializer contract
///
/// `element_size` must return the same value for the lifetime of the
/// serializer; it is written into (and validated against) file headers.
pub trait FixedSizeSerializer<T>: Serializer<T> {
    fn element_size(&self) -> usize;
}
