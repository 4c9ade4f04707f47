use readahead_types::{Error, Result};

/// Default size of a single read, and so the largest chunk ever delivered (4KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Upper bound accepted for `chunk_size` (64MiB)
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Configuration for a file read source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Capacity of each read buffer.
    ///
    /// Only one buffer is ever in flight and at most one more is held back
    /// waiting for demand, so memory use per subscription is bounded by
    /// twice this value. Consumers must not rely on chunk boundaries.
    pub chunk_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SourceConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidConfig(format!(
                "chunk_size {} exceeds the maximum of {MAX_CHUNK_SIZE} bytes",
                self.chunk_size
            )));
        }
        Ok(())
    }
}
