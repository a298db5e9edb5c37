//! Configuration for diskarray
//!
//! Centralized configuration with sensible defaults.

use crate::error::{DiskArrayError, Result};

/// Configuration shared by builders and the databases they produce
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Build Configuration
    // -------------------------------------------------------------------------
    /// Starting size of the reusable serialization buffer (in bytes)
    pub initial_buffer_size: usize,

    /// Multiplier applied when a variable-size serializer reports that
    /// the buffer is too small
    pub buffer_growth_factor: usize,

    /// Capacity of the buffered writer used while building (in bytes)
    pub write_buffer_size: usize,

    /// fsync the file after the format marker is finalized
    pub sync_on_finish: bool,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Capacity of buffered readers used by scans and header validation
    pub read_buffer_size: usize,

    /// Records kept per reader by the LRU cache; 0 disables caching
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_buffer_size: 8192,
            buffer_growth_factor: 2,
            write_buffer_size: 64 * 1024, // 64 KB
            sync_on_finish: true,
            read_buffer_size: 8 * 1024, // 8 KB
            cache_capacity: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the builders cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.initial_buffer_size == 0 {
            return Err(DiskArrayError::Config(
                "initial_buffer_size must be non-zero".to_string(),
            ));
        }
        if self.buffer_growth_factor < 2 {
            return Err(DiskArrayError::Config(format!(
                "buffer_growth_factor must be at least 2, got {}",
                self.buffer_growth_factor
            )));
        }
        if self.write_buffer_size == 0 || self.read_buffer_size == 0 {
            return Err(DiskArrayError::Config(
                "I/O buffer sizes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the starting serialization buffer size (in bytes)
    pub fn initial_buffer_size(mut self, size: usize) -> Self {
        self.config.initial_buffer_size = size;
        self
    }

    /// Set the buffer growth factor
    pub fn buffer_growth_factor(mut self, factor: usize) -> Self {
        self.config.buffer_growth_factor = factor;
        self
    }

    /// Set the write buffer capacity (in bytes)
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.config.write_buffer_size = size;
        self
    }

    /// Set the read buffer capacity (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the per-reader cache capacity (0 disables caching)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Enable or disable fsync after a build finishes
    pub fn sync_on_finish(mut self, sync: bool) -> Self {
        self.config.sync_on_finish = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
