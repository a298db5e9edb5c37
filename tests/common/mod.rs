//! Shared helpers for integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use diskarray::{DiskArrayError, Encoded, FixedSizeSerializer, Result, Serializer};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

// =============================================================================
// Setup
// =============================================================================

/// Fresh temp directory plus a database path inside it
pub fn setup_temp_db() -> (TempDir, PathBuf) {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");
    (temp_dir, path)
}

/// Route tracing output through the test harness (`RUST_LOG=debug`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Deterministic data
// =============================================================================

/// Small xorshift generator so test data is reproducible
pub struct TestRng(u64);

impl TestRng {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn next_i32(&mut self) -> i32 {
        (self.next_u64() >> 32) as i32
    }

    /// Decimal string of exactly `width` digits
    pub fn digits(&mut self, width: usize) -> String {
        (0..width)
            .map(|_| char::from(b'0' + (self.next_u64() % 10) as u8))
            .collect()
    }
}

pub fn ok_all<T>(items: Vec<T>) -> impl Iterator<Item = Result<T>> {
    items.into_iter().map(Ok)
}

// =============================================================================
// Compound element types
// =============================================================================

/// Variable-size record stored with bincode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: u32,
    pub name: String,
    pub tags: Vec<String>,
}

pub fn person(id: u32) -> Person {
    Person {
        id,
        name: format!("person-{}", id),
        tags: (0..id % 4).map(|t| format!("tag{}", t)).collect(),
    }
}

/// Fixed-size record: (i32 key, u64 value)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub key: i32,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PairSerializer;

impl Serializer<Pair> for PairSerializer {
    fn try_serialize(&self, value: &Pair, output: &mut [u8]) -> Result<Encoded> {
        if output.len() < 12 {
            return Ok(Encoded::BufferTooSmall { required: Some(12) });
        }
        output[..4].copy_from_slice(&value.key.to_le_bytes());
        output[4..12].copy_from_slice(&value.value.to_le_bytes());
        Ok(Encoded::Written(12))
    }

    fn deserialize(&self, input: &[u8]) -> Result<Pair> {
        if input.len() != 12 {
            return Err(DiskArrayError::Serialization(format!(
                "pair needs 12 bytes, got {}",
                input.len()
            )));
        }
        Ok(Pair {
            key: i32::from_le_bytes(input[..4].try_into().unwrap()),
            value: u64::from_le_bytes(input[4..12].try_into().unwrap()),
        })
    }
}

impl FixedSizeSerializer<Pair> for PairSerializer {
    fn element_size(&self) -> usize {
        12
    }
}

/// Declares 8 bytes but writes only 4
#[derive(Debug, Clone, Copy, Default)]
pub struct LyingSerializer;

impl Serializer<i32> for LyingSerializer {
    fn try_serialize(&self, value: &i32, output: &mut [u8]) -> Result<Encoded> {
        output[..4].copy_from_slice(&value.to_le_bytes());
        Ok(Encoded::Written(4))
    }

    fn deserialize(&self, input: &[u8]) -> Result<i32> {
        Ok(i32::from_le_bytes(input[..4].try_into().unwrap()))
    }
}

impl FixedSizeSerializer<i32> for LyingSerializer {
    fn element_size(&self) -> usize {
        8
    }
}
