//! Error types for diskarray
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DiskArrayError
pub type Result<T> = std::result::Result<T, DiskArrayError>;

/// Unified error type for diskarray operations
#[derive(Debug, Error)]
pub enum DiskArrayError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of data: wanted {len} bytes at offset {offset}")]
    UnexpectedEof { offset: u64, len: usize },

    #[error("File handle is closed")]
    Closed,

    #[error("Read was cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Record id {id} out of range (array holds {len} records)")]
    OutOfRange { id: u64, len: u64 },

    #[error("Invalid id range: start {start} is past end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Array {index} not found (database holds {count} arrays)")]
    ArrayNotFound { index: usize, count: usize },

    #[error("Array {index} was not declared with element type {requested}")]
    TypeMismatch {
        index: usize,
        requested: &'static str,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Element source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiskArrayError {
    /// Wrap an arbitrary error raised by an element generator.
    pub fn source<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DiskArrayError::Source(err.into())
    }

    /// Whether create-or-open may answer this error by rebuilding the file.
    ///
    /// Covers a missing file, a short file and anything detected as corrupt
    /// (bad marker, schema mismatch, layout mismatch).
    pub fn is_rebuildable(&self) -> bool {
        match self {
            DiskArrayError::Corruption(_) | DiskArrayError::UnexpectedEof { .. } => true,
            DiskArrayError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
