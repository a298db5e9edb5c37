//! Database Opening
//!
//! Walks the array headers of an existing file and checks each against the
//! caller's declaration. Nothing is rewritten.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::buffer::read_exact_at;
use crate::config::Config;
use crate::error::{DiskArrayError, Result};
use crate::file::{read_only_factory, RandomAccessFile};
use crate::format::{ArrayHeader, FileHeader, LayoutKind, ARRAY_HEADER_SIZE, FILE_HEADER_SIZE};
use crate::serializer::{FixedSizeSerializer, Serializer};

use super::{reject_directory, ArrayEntry, Database, SerializerHandle};

/// Opens a finalized database, one declared array at a time
///
/// Declaring fewer arrays than the file holds is allowed; the remaining
/// arrays are simply not reachable.
pub struct OpeningBuilder {
    /// Sequential handle used only for the header walk
    reader: BufReader<File>,
    /// Offset of the next array header
    position: u64,
    file_len: u64,
    database: Database,
}

impl OpeningBuilder {
    pub(crate) fn new(path: &Path, schema_id: Uuid, config: Config) -> Result<Self> {
        config.validate()?;
        reject_directory(path)?;

        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::with_capacity(config.read_buffer_size, file);

        let mut bytes = [0u8; FILE_HEADER_SIZE as usize];
        read_exact_at(&mut reader, 0, &mut bytes)?;
        FileHeader::decode(&bytes)?.validate(schema_id)?;

        let file = RandomAccessFile::open(read_only_factory(path), config.read_buffer_size)?;

        Ok(Self {
            reader,
            position: FILE_HEADER_SIZE,
            file_len,
            database: Database::new(path, schema_id, config, Arc::new(file)),
        })
    }

    /// Declare the next array as clustered with `serializer`'s element size
    pub fn add_fixed_array<T, S>(mut self, serializer: S) -> Result<Self>
    where
        T: 'static,
        S: FixedSizeSerializer<T> + 'static,
    {
        self.push_array(SerializerHandle::fixed(serializer)?)?;
        Ok(self)
    }

    /// Declare the next array as indirect
    pub fn add_variable_array<T, S>(mut self, serializer: S) -> Result<Self>
    where
        T: 'static,
        S: Serializer<T> + 'static,
    {
        self.push_array(SerializerHandle::variable(serializer))?;
        Ok(self)
    }

    /// Validate the next on-disk header against `handle` and record it
    pub(crate) fn push_array<T: 'static>(&mut self, handle: SerializerHandle<T>) -> Result<()> {
        let index = self.database.array_count();

        // Step 1: read header
        let mut bytes = [0u8; ARRAY_HEADER_SIZE as usize];
        read_exact_at(&mut self.reader, self.position, &mut bytes)?;
        let header = ArrayHeader::decode(self.position, &bytes)?;

        // Step 2: payload must fit in the file
        if header.ends_at() > self.file_len {
            return Err(DiskArrayError::Corruption(format!(
                "array {} ends at {} but the file is {} bytes",
                index,
                header.ends_at(),
                self.file_len
            )));
        }

        // Step 3: layout must match the declaration
        match (&handle, header.layout) {
            (SerializerHandle::Fixed { element_size, .. }, LayoutKind::Clustered) => {
                if let Some(len) = header.record_length()? {
                    if len != *element_size as u64 {
                        return Err(DiskArrayError::Corruption(format!(
                            "array {} has {} byte records, declared {}",
                            index, len, element_size
                        )));
                    }
                }
            }
            (SerializerHandle::Variable(_), LayoutKind::Indirect) => {}
            (_, layout) => {
                return Err(DiskArrayError::Corruption(format!(
                    "array {} is stored as {:?}, declared otherwise",
                    index, layout
                )));
            }
        }

        // Step 4: skip the payload
        self.reader.seek(SeekFrom::Start(header.ends_at()))?;
        self.position = header.ends_at();

        debug!(
            index,
            layout = ?header.layout,
            record_count = header.record_count,
            payload_len = header.payload_len,
            "Validated array"
        );

        self.database.push_array(ArrayEntry::new(header, handle));
        Ok(())
    }

    pub fn finish(self) -> Result<Database> {
        info!(
            path = %self.database.path().display(),
            arrays = self.database.array_count(),
            "Opened database"
        );
        Ok(self.database)
    }
}
