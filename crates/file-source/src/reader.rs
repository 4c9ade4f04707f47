//! Positional chunk readers

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// One asynchronous read primitive, driven one call at a time.
///
/// The source never calls `read_at` again before the previous call resolved,
/// so implementations may keep positional state without synchronization.
#[async_trait]
pub trait ChunkReader: Send + 'static {
    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes written to `buf`. A short count is only
    /// allowed at end of file, and `0` means end of file.
    async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Reads a local file through `tokio::fs`
pub struct TokioFileReader {
    file: tokio::fs::File,
    position: u64,
}

impl TokioFileReader {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self { file, position: 0 })
    }
}

#[async_trait]
impl ChunkReader for TokioFileReader {
    async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        if offset != self.position {
            self.position = self.file.seek(SeekFrom::Start(offset)).await?;
        }

        // Keep reading until the buffer is full so that only the final chunk
        // of a file can be short.
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        self.position += filled as u64;
        Ok(filled)
    }
}
