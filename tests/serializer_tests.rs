//! Tests for the built-in serializers
//!
//! These tests verify:
//! - Fixed-size numeric encodings are little-endian
//! - Too-small buffers are reported, never written past
//! - Padded strings enforce their width
//! - Bincode handles arbitrary serde types

mod common;

use common::{person, Person};
use diskarray::{
    BincodeSerializer, BytesSerializer, DiskArrayError, Encoded, F64Serializer,
    FixedSizeSerializer, I32Serializer, I64Serializer, PaddedUtf8Serializer, Serializer,
    U32Serializer, U64Serializer, Utf8Serializer,
};

// =============================================================================
// Numeric Serializers
// =============================================================================

#[test]
fn test_numeric_element_sizes() {
    assert_eq!(FixedSizeSerializer::<i32>::element_size(&I32Serializer), 4);
    assert_eq!(FixedSizeSerializer::<u32>::element_size(&U32Serializer), 4);
    assert_eq!(FixedSizeSerializer::<i64>::element_size(&I64Serializer), 8);
    assert_eq!(FixedSizeSerializer::<u64>::element_size(&U64Serializer), 8);
    assert_eq!(FixedSizeSerializer::<f64>::element_size(&F64Serializer), 8);
}

#[test]
fn test_i32_is_little_endian() {
    let mut buf = [0u8; 4];
    let written = I32Serializer.try_serialize(&-2, &mut buf).unwrap();

    assert_eq!(written, Encoded::Written(4));
    assert_eq!(buf, [0xFE, 0xFF, 0xFF, 0xFF]);
    assert_eq!(I32Serializer.deserialize(&buf).unwrap(), -2);
}

#[test]
fn test_u64_and_f64_values() {
    let mut buf = [0u8; 8];

    U64Serializer.try_serialize(&u64::MAX, &mut buf).unwrap();
    assert_eq!(U64Serializer.deserialize(&buf).unwrap(), u64::MAX);

    F64Serializer.try_serialize(&-0.5, &mut buf).unwrap();
    assert_eq!(F64Serializer.deserialize(&buf).unwrap(), -0.5);
}

#[test]
fn test_numeric_buffer_too_small() {
    let mut buf = [0xAAu8; 3];
    let result = I64Serializer.try_serialize(&1, &mut buf).unwrap();

    assert_eq!(result, Encoded::BufferTooSmall { required: Some(8) });
    assert_eq!(buf, [0xAA; 3]);
}

#[test]
fn test_numeric_short_input() {
    let result = U32Serializer.deserialize(&[1, 2]);
    assert!(matches!(result, Err(DiskArrayError::Serialization(_))));
}

// =============================================================================
// String and Byte Serializers
// =============================================================================

#[test]
fn test_utf8_reports_required_size() {
    let mut buf = [0u8; 2];
    let result = Utf8Serializer
        .try_serialize(&"héllo".to_string(), &mut buf)
        .unwrap();
    assert_eq!(result, Encoded::BufferTooSmall { required: Some(6) });
}

#[test]
fn test_utf8_rejects_invalid_bytes() {
    let result = Utf8Serializer.deserialize(&[0xFF, 0xFE]);
    assert!(matches!(result, Err(DiskArrayError::Serialization(_))));
}

#[test]
fn test_bytes_serializer_copies_verbatim() {
    let mut buf = [0u8; 8];
    let value = vec![0u8, 1, 2, 255];

    assert_eq!(
        BytesSerializer.try_serialize(&value, &mut buf).unwrap(),
        Encoded::Written(4)
    );
    assert_eq!(BytesSerializer.deserialize(&buf[..4]).unwrap(), value);
}

#[test]
fn test_padded_utf8_pads_with_zeros() {
    let serializer = PaddedUtf8Serializer::new(6);
    let mut buf = [0xAAu8; 6];

    let result = serializer.try_serialize(&"abc".to_string(), &mut buf).unwrap();
    assert_eq!(result, Encoded::Written(6));
    assert_eq!(buf, [b'a', b'b', b'c', 0, 0, 0]);
    assert_eq!(serializer.deserialize(&buf).unwrap(), "abc");
    assert_eq!(serializer.element_size(), 6);
}

#[test]
fn test_padded_utf8_rejects_oversize_and_nul() {
    let serializer = PaddedUtf8Serializer::new(3);
    let mut buf = [0u8; 3];

    assert!(serializer.try_serialize(&"abcd".to_string(), &mut buf).is_err());
    assert!(serializer.try_serialize(&"a\0b".to_string(), &mut buf).is_err());
}

// =============================================================================
// Bincode Serializer
// =============================================================================

#[test]
fn test_bincode_struct() {
    let serializer = BincodeSerializer::<Person>::new();
    let value = person(7);
    let mut buf = vec![0u8; 256];

    let len = match serializer.try_serialize(&value, &mut buf).unwrap() {
        Encoded::Written(len) => len,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(serializer.deserialize(&buf[..len]).unwrap(), value);
}

#[test]
fn test_bincode_buffer_too_small_hint() {
    let serializer = BincodeSerializer::<Vec<u64>>::new();
    let value = vec![1u64, 2, 3];
    let mut buf = [0u8; 4];

    // u64 length prefix + three u64s
    assert_eq!(
        serializer.try_serialize(&value, &mut buf).unwrap(),
        Encoded::BufferTooSmall { required: Some(32) }
    );
}
