//! Random-Access File
//!
//! One long-lived handle for positioned reads, shared by every reader of a
//! database, plus a factory for independent sequential handles.
//!
//! ## Concurrency
//! - Positioned reads take the handle's mutex for seek + read, so reads from
//!   different call sites can never interleave their seeks.
//! - Scans open their own handles through the factory and never touch the
//!   shared one.
//! - Async reads run the same locked section on Tokio's blocking pool.

use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::AsyncSeekExt;

use crate::buffer::read_exact_at;
use crate::error::{DiskArrayError, Result};

/// Produces fresh read handles onto the same file
pub type StreamFactory = Arc<dyn Fn() -> io::Result<File> + Send + Sync>;

/// Factory opening `path` read-only
pub fn read_only_factory(path: &Path) -> StreamFactory {
    let path: PathBuf = path.to_path_buf();
    Arc::new(move || File::open(&path))
}

/// Concurrency-safe positioned reads over one shared file handle
pub struct RandomAccessFile {
    /// `None` once closed
    stream: Mutex<Option<File>>,
    factory: StreamFactory,
    read_buffer_size: usize,
}

impl RandomAccessFile {
    /// Open the positioned-read handle through `factory`
    pub fn open(factory: StreamFactory, read_buffer_size: usize) -> Result<Self> {
        let stream = factory()?;
        Ok(Self {
            stream: Mutex::new(Some(stream)),
            factory,
            read_buffer_size: read_buffer_size.max(1),
        })
    }

    /// Fill `buf` from `offset`
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut guard = self.stream.lock();
        let stream = guard.as_mut().ok_or(DiskArrayError::Closed)?;
        stream.seek(SeekFrom::Start(offset))?;
        read_exact_at(stream, offset, buf)
    }

    /// Read `len` bytes from `offset` into a new vector
    pub fn read_vec_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Async positioned read.
    ///
    /// The locked seek + read runs on the blocking pool so no async worker
    /// waits on disk. Requires a Tokio runtime.
    pub async fn read_at_async(self: &Arc<Self>, offset: u64, len: usize) -> Result<Vec<u8>> {
        let file = Arc::clone(self);
        tokio::task::spawn_blocking(move || file.read_vec_at(offset, len))
            .await
            .map_err(join_error)?
    }

    /// Swap the positioned-read handle for a freshly opened one
    pub fn reopen(&self) -> Result<()> {
        let mut guard = self.stream.lock();
        if guard.is_none() {
            return Err(DiskArrayError::Closed);
        }
        *guard = Some((self.factory)()?);
        Ok(())
    }

    /// Close the positioned-read handle. Idempotent.
    ///
    /// Handles already returned by [`open_stream_at`](Self::open_stream_at)
    /// belong to their callers and stay open.
    pub fn close(&self) {
        self.stream.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.stream.lock().is_none()
    }

    /// Current length of the file in bytes
    pub fn len(&self) -> Result<u64> {
        let guard = self.stream.lock();
        let stream = guard.as_ref().ok_or(DiskArrayError::Closed)?;
        Ok(stream.metadata()?.len())
    }

    /// Independent buffered handle positioned at `offset`
    pub fn open_stream_at(&self, offset: u64) -> Result<BufReader<File>> {
        if self.is_closed() {
            return Err(DiskArrayError::Closed);
        }
        let mut file = (self.factory)()?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(BufReader::with_capacity(self.read_buffer_size, file))
    }

    /// Async twin of [`open_stream_at`](Self::open_stream_at)
    pub async fn open_stream_at_async(
        &self,
        offset: u64,
    ) -> Result<tokio::io::BufReader<tokio::fs::File>> {
        if self.is_closed() {
            return Err(DiskArrayError::Closed);
        }
        let factory = Arc::clone(&self.factory);
        let std_file = tokio::task::spawn_blocking(move || factory())
            .await
            .map_err(join_error)??;

        let mut file = tokio::fs::File::from_std(std_file);
        file.seek(SeekFrom::Start(offset)).await?;
        Ok(tokio::io::BufReader::with_capacity(
            self.read_buffer_size,
            file,
        ))
    }
}

impl std::fmt::Debug for RandomAccessFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomAccessFile")
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn join_error(err: tokio::task::JoinError) -> DiskArrayError {
    if err.is_cancelled() {
        DiskArrayError::Cancelled
    } else {
        std::panic::resume_unwind(err.into_panic())
    }
}
