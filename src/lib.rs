//! # diskarray
//!
//! An embedded, read-mostly, file-backed array store:
//! - Build typed, optionally sorted arrays once into a single file
//! - Point lookups, range reads and scans straight from disk
//! - Binary and equal-range search without loading the array
//! - Fixed-size (clustered) and variable-size (indirect) layouts
//! - Pluggable record cache, sync and async read paths
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Database                             │
//! │        create / open / create_or_open + typed get::<T>       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  DiskArray<T> readers                        │
//! │             (ClusteredArray | IndirectArray)                 │
//! └──────┬──────────────────┬──────────────────────┬────────────┘
//!        │                  │                      │
//!        ▼                  ▼                      ▼
//!  ┌───────────┐    ┌──────────────┐     ┌──────────────────┐
//!  │  Search   │    │ Record Cache │     │ RandomAccessFile │
//!  │ (bounds)  │    │ (LRU / none) │     │ (Mutex + seek)   │
//!  └───────────┘    └──────────────┘     └──────────────────┘
//! ```
//!
//! ## Example
//! ```no_run
//! use diskarray::{Database, I32Serializer};
//! use uuid::Uuid;
//!
//! # fn main() -> diskarray::Result<()> {
//! let schema = Uuid::new_v4();
//! let db = Database::create("numbers.db", schema)?
//!     .add_fixed_array_sorted_by_key(
//!         I32Serializer,
//!         |_| Ok(vec![5, 1, 3].into_iter().map(Ok)),
//!         |n: &i32| *n,
//!     )?
//!     .finish()?;
//!
//! let numbers = db.get::<i32>(0)?;
//! assert_eq!(numbers.binary_search_by_key(&3, |n| *n)?, Some((1, 3)));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod buffer;
pub mod search;
pub mod serializer;
pub mod file;
pub mod cache;
pub mod format;
pub mod array;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DiskArrayError, Result};
pub use config::{Config, ConfigBuilder};

pub use array::{ClusteredArray, DiskArray, IndirectArray, LinearScan};
pub use cache::{CacheStats, LruRecordCache, NoCache, RecordCache};
pub use database::{Database, DatabaseBuilder, OpeningBuilder};
pub use file::{RandomAccessFile, StreamFactory};
pub use format::{ArrayHeader, LayoutKind};
pub use serializer::{
    BincodeSerializer, BytesSerializer, Encoded, F64Serializer, FixedSizeSerializer,
    I32Serializer, I64Serializer, PaddedUtf8Serializer, Serializer, U32Serializer, U64Serializer,
    Utf8Serializer,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of diskarray
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
