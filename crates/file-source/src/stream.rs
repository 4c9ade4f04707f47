//! `futures::Stream` adapters
//!
//! [`PublisherStream`] turns any [`Publisher`] into a pull-driven stream that
//! only requests more chunks as the stream is polled, which is what an upload
//! body or any other `Stream` consumer needs. [`read_chunks`] is the simpler
//! sequential variant: one awaited read per item, no demand bookkeeping.

use crate::config::SourceConfig;
use crate::reader::{ChunkReader, TokioFileReader};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use readahead_types::{Error, Publisher, Result, Subscriber, Subscription};
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

enum Signal {
    Next(Bytes),
    Error(Error),
    Complete,
}

/// Subscriber half of [`PublisherStream`]: forwards every signal into a channel.
struct Forwarder {
    signals: mpsc::UnboundedSender<Signal>,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
}

impl Subscriber for Forwarder {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    fn on_next(&self, chunk: Bytes) {
        // The receiver is gone only after the stream was dropped and cancelled.
        let _ = self.signals.send(Signal::Next(chunk));
    }

    fn on_error(&self, error: Error) {
        let _ = self.signals.send(Signal::Error(error));
    }

    fn on_complete(&self) {
        let _ = self.signals.send(Signal::Complete);
    }
}

/// A [`Publisher`] consumed as a `Stream<Item = Result<Bytes>>`.
///
/// Demand is signalled in batches of `batch` chunks, and only once every
/// chunk of the previous batch has been yielded. Dropping the stream before
/// it finishes cancels the subscription.
pub struct PublisherStream {
    signals: UnboundedReceiverStream<Signal>,
    subscription: Option<Arc<dyn Subscription>>,
    batch: u64,
    outstanding: u64,
    finished: bool,
}

impl PublisherStream {
    /// Subscribe to `publisher`, requesting one chunk at a time.
    pub fn new<P: Publisher>(publisher: P) -> Self {
        Self::with_batch(publisher, 1)
    }

    pub fn with_batch<P: Publisher>(publisher: P, batch: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = Arc::new(Forwarder {
            signals: tx,
            subscription: Mutex::new(None),
        });

        publisher.subscribe(forwarder.clone());

        // Take the handle back out so the publisher's reference to the
        // forwarder does not form a cycle through the subscription.
        let subscription = forwarder
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        Self {
            signals: UnboundedReceiverStream::new(rx),
            subscription,
            batch: u64::from(batch.max(1)),
            outstanding: 0,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.subscription = None;
    }
}

impl Stream for PublisherStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        if this.outstanding == 0 {
            if let Some(subscription) = &this.subscription {
                subscription.request(this.batch as i64);
                this.outstanding = this.batch;
            }
        }

        match ready!(Pin::new(&mut this.signals).poll_next(cx)) {
            Some(Signal::Next(chunk)) => {
                this.outstanding = this.outstanding.saturating_sub(1);
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Signal::Error(error)) => {
                this.finish();
                Poll::Ready(Some(Err(error)))
            }
            Some(Signal::Complete) | None => {
                this.finish();
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for PublisherStream {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

/// Read a local file as a stream of chunks, one awaited read at a time.
///
/// The file is closed when the stream ends or is dropped.
pub async fn read_chunks(
    path: impl AsRef<Path>,
    config: SourceConfig,
) -> Result<impl Stream<Item = Result<Bytes>>> {
    config.validate()?;
    let reader = TokioFileReader::open(path.as_ref()).await?;
    Ok(chunks_from_reader(reader, config.chunk_size))
}

fn chunks_from_reader<R: ChunkReader>(
    reader: R,
    chunk_size: usize,
) -> impl Stream<Item = Result<Bytes>> {
    futures::stream::try_unfold((reader, 0u64), move |(mut reader, offset)| async move {
        let mut buf = BytesMut::zeroed(chunk_size);
        let bytes_read = reader.read_at(offset, &mut buf).await?;
        if bytes_read == 0 {
            return Ok::<_, Error>(None);
        }
        buf.truncate(bytes_read);
        Ok(Some((buf.freeze(), (reader, offset + bytes_read as u64))))
    })
}
