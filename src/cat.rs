//! `readahead cat`: copy a file to a writer through the publisher

use crate::file_source::{FileReadSource, PublisherStream};
use crate::metrics::RunMetrics;
use crate::ReadOpts;
use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Stream `path` into `writer`, returning the number of bytes written.
pub async fn cat_to<W>(path: &Path, opts: &ReadOpts, writer: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let source = FileReadSource::open_with_config(path, opts.source_config())
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let run = RunMetrics::start(source.metrics());

    let mut chunks = PublisherStream::with_batch(source, opts.request_batch);
    let mut written = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read {}", path.display()))?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
        debug!("Wrote chunk of {} bytes ({written} total)", chunk.len());
    }
    writer.flush().await?;

    info!("Copied {written} bytes from {}", path.display());
    run.emit(opts.emit_metrics.as_deref(), path, opts.chunk_size)
        .await?;
    Ok(written)
}

pub async fn run(path: &Path, opts: &ReadOpts) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    cat_to(path, opts, &mut stdout).await?;
    Ok(())
}
