//! File read source: owns the reader and issues one read at a time

use crate::config::SourceConfig;
use crate::dispatch::Dispatcher;
use crate::metrics::ReadMetrics;
use crate::reader::{ChunkReader, TokioFileReader};
use crate::state::{DemandState, Event, Outcome, Phase};
use bytes::BytesMut;
use readahead_types::{Error, Result, Subscriber};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// A single-use publisher of file chunks.
///
/// Reads are started only when the subscriber has signalled demand, at most
/// one read is in flight, and at most one finished chunk is held back waiting
/// for demand.
///
/// # Example
///
/// ```ignore
/// let source = FileReadSource::open("data.bin").await?;
/// source.subscribe(subscriber);
/// ```
pub struct FileReadSource<R: ChunkReader = TokioFileReader> {
    reader: R,
    config: SourceConfig,
    runtime: Handle,
    metrics: ReadMetrics,
}

impl FileReadSource<TokioFileReader> {
    /// Open a local file with the default configuration.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, SourceConfig::default()).await
    }

    pub async fn open_with_config(path: impl AsRef<Path>, config: SourceConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;
        let reader = TokioFileReader::open(path).await?;
        debug!(
            "Opened {} for chunked reading ({} byte chunks)",
            path.display(),
            config.chunk_size
        );
        Self::from_reader(reader, config, Handle::current())
    }
}

impl<R: ChunkReader> FileReadSource<R> {
    /// Build a source over any reader. Reads are spawned on `runtime`.
    pub fn from_reader(reader: R, config: SourceConfig, runtime: Handle) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader,
            config,
            runtime,
            metrics: ReadMetrics::new(),
        })
    }

    /// Counters shared with the running subscription
    pub fn metrics(&self) -> ReadMetrics {
        self.metrics.clone()
    }

    pub(crate) fn into_pipeline(self, subscriber: Arc<dyn Subscriber>) -> Arc<Pipeline<R>> {
        Arc::new(Pipeline {
            state: DemandState::new(),
            cursor: Mutex::new(Some(FileCursor {
                reader: self.reader,
                offset: 0,
            })),
            dispatcher: Dispatcher::new(subscriber, self.metrics.clone()),
            runtime: self.runtime,
            chunk_size: self.config.chunk_size,
            metrics: self.metrics,
        })
    }
}

/// The reader together with the offset of the next read.
///
/// Between reads it is parked in the pipeline; while a read runs the read task
/// owns it. Dropping it releases the file.
struct FileCursor<R> {
    reader: R,
    offset: u64,
}

/// Everything one subscription shares between its handle and its read tasks
pub(crate) struct Pipeline<R: ChunkReader> {
    pub(crate) state: DemandState,
    cursor: Mutex<Option<FileCursor<R>>>,
    pub(crate) dispatcher: Dispatcher,
    runtime: Handle,
    chunk_size: usize,
    metrics: ReadMetrics,
}

impl<R: ChunkReader> Pipeline<R> {
    /// Start the next read on the runtime.
    ///
    /// Must only be called by whoever won the transition that calls for a
    /// read. Finding no parked cursor outside of cancellation means a second
    /// read was issued while one was still running.
    pub(crate) fn issue_read(self: &Arc<Self>) {
        let Some(mut cursor) = self.lock_cursor().take() else {
            if self.state.phase() == Phase::Cancelled {
                return;
            }
            panic!("read state protocol violation: read issued while another read is in flight");
        };

        self.metrics.read_started();
        trace!("Reading {} bytes at offset {}", self.chunk_size, cursor.offset);

        let pipeline = Arc::clone(self);
        self.runtime.spawn(async move {
            let mut buf = BytesMut::zeroed(pipeline.chunk_size);
            let result = cursor.reader.read_at(cursor.offset, &mut buf).await;
            pipeline.on_read_complete(cursor, buf, result);
        });
    }

    fn on_read_complete(
        self: &Arc<Self>,
        mut cursor: FileCursor<R>,
        mut buf: BytesMut,
        result: std::io::Result<usize>,
    ) {
        match result {
            Ok(0) => {
                self.metrics.read_finished(0);
                debug!("Reached end of file at offset {}", cursor.offset);
                drop(cursor);
                self.settle(Event::Completed);
            }
            Ok(bytes_read) => {
                self.metrics.read_finished(bytes_read);
                cursor.offset += bytes_read as u64;
                buf.truncate(bytes_read);
                // Park before publishing the chunk: a request that claims it
                // issues the next read from another thread.
                *self.lock_cursor() = Some(cursor);
                self.settle(Event::Chunk(buf.freeze()));
            }
            Err(e) => {
                self.metrics.read_finished(0);
                let offset = cursor.offset;
                drop(cursor);
                if self.state.phase() == Phase::Cancelled {
                    debug!("Discarding read failure after cancellation: {}", e);
                    return;
                }
                warn!("Read failed at offset {}: {}", offset, e);
                self.dispatcher.error(Error::Io(e));
            }
        }
    }

    fn settle(self: &Arc<Self>, event: Event) {
        match self.state.consume_or_buffer(event) {
            Outcome::Deliver(Event::Chunk(chunk)) => {
                self.dispatcher.next(chunk);
                self.issue_read();
            }
            Outcome::Deliver(Event::Completed) => self.dispatcher.complete(),
            Outcome::Buffered => trace!("No outstanding demand, holding event"),
            Outcome::Discarded => self.release(),
        }
    }

    /// Drop the parked reader, closing the file.
    pub(crate) fn release(&self) {
        if self.lock_cursor().take().is_some() {
            debug!("Released file handle");
        }
    }

    fn lock_cursor(&self) -> MutexGuard<'_, Option<FileCursor<R>>> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
