//! Database Module
//!
//! A database is one file holding an ordered list of typed arrays.
//!
//! ## Responsibilities
//! - Create, open, or create-or-open a database file
//! - Own the shared random-access file and the list of array headers
//! - Hand out typed readers by declaration index
//!
//! ## Lifecycle
//! ```text
//! create ─────────► DatabaseBuilder ──add_*──► write array ──finish──► marker = 1
//! open ───────────► OpeningBuilder ──add_*──► validate header ──finish──┐
//! create_or_open ─► header ok?  ── no ──► create                         ▼
//!                        │ yes                                       Database
//!                        └──► record declarations ──finish──► all valid? ──┐
//!                                                             │ no         │ yes
//!                                                             ▼            ▼
//!                                                        rebuild        open
//! ```

mod builder;
mod create;
mod open;

pub use builder::DatabaseBuilder;
pub use open::OpeningBuilder;

use std::any::{type_name, Any};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::array::{ClusteredArray, DiskArray, IndirectArray};
use crate::cache::{LruRecordCache, NoCache, RecordCache};
use crate::config::Config;
use crate::error::{DiskArrayError, Result};
use crate::file::RandomAccessFile;
use crate::format::ArrayHeader;
use crate::serializer::{FixedSizeSerializer, Serializer};

// =============================================================================
// Type-erased serializers
// =============================================================================

/// Serializer of one array, tagged with the layout it implies
pub(crate) enum SerializerHandle<T> {
    Fixed {
        element_size: usize,
        codec: Arc<dyn Serializer<T>>,
    },
    Variable(Arc<dyn Serializer<T>>),
}

impl<T> SerializerHandle<T> {
    /// Fixed-size records must occupy at least one byte
    pub(crate) fn fixed<S>(serializer: S) -> Result<Self>
    where
        S: FixedSizeSerializer<T> + 'static,
    {
        let element_size = serializer.element_size();
        if element_size == 0 {
            return Err(DiskArrayError::Serialization(format!(
                "fixed-size serializer for {} reports an element size of 0",
                type_name::<T>()
            )));
        }
        Ok(SerializerHandle::Fixed {
            element_size,
            codec: Arc::new(serializer),
        })
    }

    pub(crate) fn variable<S>(serializer: S) -> Self
    where
        S: Serializer<T> + 'static,
    {
        SerializerHandle::Variable(Arc::new(serializer))
    }
}

impl<T> Clone for SerializerHandle<T> {
    fn clone(&self) -> Self {
        match self {
            SerializerHandle::Fixed {
                element_size,
                codec,
            } => SerializerHandle::Fixed {
                element_size: *element_size,
                codec: Arc::clone(codec),
            },
            SerializerHandle::Variable(codec) => SerializerHandle::Variable(Arc::clone(codec)),
        }
    }
}

/// One array of the database: its header plus a `SerializerHandle<T>` for
/// whatever `T` it was declared with
pub(crate) struct ArrayEntry {
    header: ArrayHeader,
    serializer: Arc<dyn Any + Send + Sync>,
}

impl ArrayEntry {
    pub(crate) fn new<T: 'static>(header: ArrayHeader, handle: SerializerHandle<T>) -> Self {
        Self {
            header,
            serializer: Arc::new(handle),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// An open database file
///
/// ## Concurrency:
/// - `arrays`: immutable once the database is handed out, read without locks
/// - `file`: one positioned-read handle shared by every reader
/// - readers are independent values; each carries its own cache
pub struct Database {
    path: PathBuf,
    schema_id: Uuid,
    config: Config,
    file: Arc<RandomAccessFile>,
    arrays: Vec<ArrayEntry>,
}

impl Database {
    // =========================================================================
    // Entry points
    // =========================================================================

    /// Create (or truncate) a database file
    pub fn create(path: impl AsRef<Path>, schema_id: Uuid) -> Result<DatabaseBuilder> {
        Self::create_with_config(path, schema_id, Config::default())
    }

    pub fn create_with_config(
        path: impl AsRef<Path>,
        schema_id: Uuid,
        config: Config,
    ) -> Result<DatabaseBuilder> {
        DatabaseBuilder::create(path.as_ref(), schema_id, config)
    }

    /// Open an existing, finalized database file
    pub fn open(path: impl AsRef<Path>, schema_id: Uuid) -> Result<OpeningBuilder> {
        Self::open_with_config(path, schema_id, Config::default())
    }

    pub fn open_with_config(
        path: impl AsRef<Path>,
        schema_id: Uuid,
        config: Config,
    ) -> Result<OpeningBuilder> {
        OpeningBuilder::new(path.as_ref(), schema_id, config)
    }

    /// Open the file if it matches the declarations, otherwise rebuild it
    pub fn create_or_open(path: impl AsRef<Path>, schema_id: Uuid) -> Result<DatabaseBuilder> {
        Self::create_or_open_with_config(path, schema_id, Config::default())
    }

    pub fn create_or_open_with_config(
        path: impl AsRef<Path>,
        schema_id: Uuid,
        config: Config,
    ) -> Result<DatabaseBuilder> {
        DatabaseBuilder::create_or_open(path.as_ref(), schema_id, config)
    }

    pub(crate) fn new(
        path: &Path,
        schema_id: Uuid,
        config: Config,
        file: Arc<RandomAccessFile>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            schema_id,
            config,
            file,
            arrays: Vec::new(),
        }
    }

    pub(crate) fn push_array(&mut self, entry: ArrayEntry) {
        self.arrays.push(entry);
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Reader for array `index`, cached per `Config::cache_capacity`
    ///
    /// `T: Clone` is needed because the LRU hands out copies of cached
    /// records. Record types that cannot be cloned are read through
    /// [`Database::get_with_cache`] with [`NoCache`].
    pub fn get<T>(&self, index: usize) -> Result<DiskArray<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cache: Arc<dyn RecordCache<u64, T>> = if self.config.cache_capacity > 0 {
            Arc::new(LruRecordCache::new(self.config.cache_capacity)?)
        } else {
            Arc::new(NoCache)
        };
        self.get_with_cache(index, cache)
    }

    /// Reader for array `index` using the given record cache
    pub fn get_with_cache<T>(
        &self,
        index: usize,
        cache: Arc<dyn RecordCache<u64, T>>,
    ) -> Result<DiskArray<T>>
    where
        T: Send + Sync + 'static,
    {
        let entry = self
            .arrays
            .get(index)
            .ok_or(DiskArrayError::ArrayNotFound {
                index,
                count: self.arrays.len(),
            })?;

        let handle = entry
            .serializer
            .downcast_ref::<SerializerHandle<T>>()
            .ok_or(DiskArrayError::TypeMismatch {
                index,
                requested: type_name::<T>(),
            })?;

        let file = Arc::clone(&self.file);
        match handle {
            SerializerHandle::Fixed {
                element_size,
                codec,
            } => ClusteredArray::new(entry.header, *element_size, file, Arc::clone(codec), cache)
                .map(DiskArray::Clustered),
            SerializerHandle::Variable(codec) => {
                IndirectArray::new(entry.header, file, Arc::clone(codec), cache)
                    .map(DiskArray::Indirect)
            }
        }
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }

    pub fn array_header(&self, index: usize) -> Result<&ArrayHeader> {
        self.arrays
            .get(index)
            .map(|entry| &entry.header)
            .ok_or(DiskArrayError::ArrayNotFound {
                index,
                count: self.arrays.len(),
            })
    }

    pub fn schema_id(&self) -> Uuid {
        self.schema_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Handle management
    // =========================================================================

    /// Replace the positioned-read handle with a fresh one
    pub fn reopen(&self) -> Result<()> {
        self.file.reopen()
    }

    /// Close the positioned-read handle. Readers obtained earlier fail with
    /// `Closed` afterwards.
    pub fn close(&self) {
        self.file.close();
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_closed()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.file.close();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("schema_id", &self.schema_id)
            .field("arrays", &self.arrays.len())
            .finish()
    }
}

/// A directory can never become a database file
pub(crate) fn reject_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Err(DiskArrayError::Corruption(format!(
            "{} is a directory, not a database file",
            path.display()
        )));
    }
    Ok(())
}
