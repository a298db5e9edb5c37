//! Database Creation
//!
//! Writes arrays into a fresh file one at a time.
//!
//! ## Write Protocol
//! 1. File header with marker 0
//! 2. Per array: placeholder header, payload, then seek back and patch the
//!    header (and the pointer-table offset for indirect arrays)
//! 3. Flush, so later generators can read the array through the partial
//!    database
//! 4. On finish: patch marker 1, flush, fsync
//!
//! A build that stops anywhere before step 4 leaves marker 0 behind.

use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::buffer::{serialize_growing, GrowthPolicy};
use crate::config::Config;
use crate::error::{DiskArrayError, Result};
use crate::file::{read_only_factory, RandomAccessFile};
use crate::format::{
    ArrayHeader, FileHeader, LayoutKind, ARRAY_HEADER_SIZE, FILE_HEADER_SIZE, LENGTH_PREFIX_SIZE,
    MARKER_FINALIZED, POINTER_SIZE, POINTER_TABLE_OFFSET_SIZE,
};
use crate::serializer::{Encoded, Serializer};

use super::{reject_directory, ArrayEntry, Database, SerializerHandle};

/// Produces the elements of one array, given the arrays built so far
pub(crate) type Generator<T> =
    Box<dyn FnOnce(&Database) -> Result<Box<dyn Iterator<Item = Result<T>>>>>;

/// Sort order requested for one array
pub(crate) type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering>;

/// Everything needed to write one array
pub(crate) struct ArrayPlan<T> {
    pub(crate) handle: SerializerHandle<T>,
    pub(crate) generator: Generator<T>,
    pub(crate) comparator: Option<Comparator<T>>,
}

/// Writes a new database file
pub(crate) struct CreationBuilder {
    writer: BufWriter<File>,
    /// Absolute offset of the next byte written
    position: u64,
    /// Reusable serialization buffer
    buffer: Vec<u8>,
    growth: GrowthPolicy,
    /// Arrays written so far, readable by later generators
    partial: Database,
}

impl CreationBuilder {
    pub(crate) fn new(path: &Path, schema_id: Uuid, config: Config) -> Result<Self> {
        config.validate()?;
        reject_directory(path)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::with_capacity(config.write_buffer_size, file);

        writer.write_all(&FileHeader::building(schema_id).encode())?;
        writer.flush()?;

        let read_file = RandomAccessFile::open(read_only_factory(path), config.read_buffer_size)?;

        info!(path = %path.display(), %schema_id, "Creating database");

        Ok(Self {
            writer,
            position: FILE_HEADER_SIZE,
            buffer: vec![0u8; config.initial_buffer_size],
            growth: GrowthPolicy::new(config.buffer_growth_factor),
            partial: Database::new(path, schema_id, config, Arc::new(read_file)),
        })
    }

    /// Run `plan`'s generator and append the array
    pub(crate) fn write_array<T: 'static>(&mut self, plan: ArrayPlan<T>) -> Result<()> {
        let ArrayPlan {
            handle,
            generator,
            comparator,
        } = plan;

        let mut elements = generator(&self.partial)?;
        if let Some(compare) = comparator {
            let mut sorted = elements.collect::<Result<Vec<T>>>()?;
            sorted.sort_by(|a, b| compare(a, b));
            elements = Box::new(sorted.into_iter().map(Ok));
        }

        // Step 1: placeholder header
        let header_at = self.position;
        self.write(&[0u8; ARRAY_HEADER_SIZE as usize])?;
        let starts_at = self.position;

        // Step 2: payload
        let (layout, record_count) = match &handle {
            SerializerHandle::Fixed {
                element_size,
                codec,
            } => (
                LayoutKind::Clustered,
                self.write_clustered(codec.as_ref(), *element_size, elements)?,
            ),
            SerializerHandle::Variable(codec) => (
                LayoutKind::Indirect,
                self.write_indirect(codec.as_ref(), elements)?,
            ),
        };

        // Step 3: patch header
        let header = ArrayHeader {
            record_count,
            payload_len: self.position - starts_at,
            layout,
            starts_at,
        };
        self.patch(header_at, &header.encode())?;
        self.writer.flush()?;

        debug!(
            index = self.partial.array_count(),
            ?layout,
            record_count,
            payload_len = header.payload_len,
            "Wrote array"
        );

        self.partial.push_array(ArrayEntry::new(header, handle));
        Ok(())
    }

    fn write_clustered<T>(
        &mut self,
        codec: &dyn Serializer<T>,
        element_size: usize,
        elements: impl Iterator<Item = Result<T>>,
    ) -> Result<u64> {
        let mut record = vec![0u8; element_size];
        let mut count = 0u64;

        for element in elements {
            let element = element?;
            match codec.try_serialize(&element, &mut record)? {
                Encoded::Written(len) if len == element_size => {}
                Encoded::Written(len) => {
                    return Err(DiskArrayError::Serialization(format!(
                        "fixed-size serializer wrote {} bytes, declared {}",
                        len, element_size
                    )));
                }
                Encoded::BufferTooSmall { .. } => {
                    return Err(DiskArrayError::Serialization(format!(
                        "fixed-size serializer needs more than its declared {} bytes",
                        element_size
                    )));
                }
            }
            self.write(&record)?;
            count += 1;
        }
        Ok(count)
    }

    fn write_indirect<T>(
        &mut self,
        codec: &dyn Serializer<T>,
        elements: impl Iterator<Item = Result<T>>,
    ) -> Result<u64> {
        let table_offset_at = self.position;
        self.write(&[0u8; POINTER_TABLE_OFFSET_SIZE as usize])?;

        // Data region, remembering where each record starts
        let mut pointers: Vec<u64> = Vec::new();
        let mut data_len = 0u64;
        for element in elements {
            let element = element?;
            let len = serialize_growing(codec, &element, &mut self.buffer, self.growth)?;
            let prefix = u32::try_from(len).map_err(|_| {
                DiskArrayError::Serialization(format!(
                    "record of {} bytes exceeds the u32 length prefix",
                    len
                ))
            })?;

            self.writer.write_all(&prefix.to_le_bytes())?;
            self.writer.write_all(&self.buffer[..len])?;
            self.position += LENGTH_PREFIX_SIZE + len as u64;

            pointers.push(data_len);
            data_len += LENGTH_PREFIX_SIZE + len as u64;
        }

        // Pointer table
        for pointer in &pointers {
            self.write(&pointer.to_le_bytes())?;
        }
        debug_assert_eq!(
            self.position,
            table_offset_at
                + POINTER_TABLE_OFFSET_SIZE
                + data_len
                + pointers.len() as u64 * POINTER_SIZE
        );

        let relative = POINTER_TABLE_OFFSET_SIZE + data_len;
        self.patch(table_offset_at, &relative.to_le_bytes())?;
        Ok(pointers.len() as u64)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Overwrite `bytes` at `offset`, then return to the end of the file
    fn patch(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.writer.seek(SeekFrom::Start(offset))?;
        self.writer.write_all(bytes)?;
        self.writer.seek(SeekFrom::Start(self.position))?;
        Ok(())
    }

    /// Finalize the marker and hand over the database
    pub(crate) fn finish(mut self) -> Result<Database> {
        let header = FileHeader {
            marker: MARKER_FINALIZED,
            schema_id: self.partial.schema_id(),
        };
        self.patch(0, &header.encode())?;
        self.writer.flush()?;
        if self.partial.config().sync_on_finish {
            self.writer.get_ref().sync_all()?;
        }

        self.partial.reopen()?;

        info!(
            path = %self.partial.path().display(),
            arrays = self.partial.array_count(),
            bytes = self.position,
            "Created database"
        );
        Ok(self.partial)
    }
}
