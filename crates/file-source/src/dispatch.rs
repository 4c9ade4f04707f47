//! Signal delivery to the subscriber

use crate::metrics::ReadMetrics;
use bytes::Bytes;
use readahead_types::{Error, Subscriber};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Forwards events to the subscriber.
///
/// Callers are serialized by the demand state machine, so events reach the
/// subscriber in file order. The subscriber reference is dropped on the first
/// terminal signal or on shutdown, which doubles as the latch that keeps a
/// second terminal signal from ever being delivered.
pub struct Dispatcher {
    subscriber: Mutex<Option<Arc<dyn Subscriber>>>,
    metrics: ReadMetrics,
}

impl Dispatcher {
    pub fn new(subscriber: Arc<dyn Subscriber>, metrics: ReadMetrics) -> Self {
        Self {
            subscriber: Mutex::new(Some(subscriber)),
            metrics,
        }
    }

    pub fn next(&self, chunk: Bytes) {
        let Some(subscriber) = self.lock_subscriber().clone() else {
            trace!("Dropping {} byte chunk after termination", chunk.len());
            return;
        };
        self.metrics.chunk_delivered();
        subscriber.on_next(chunk);
    }

    pub fn complete(&self) {
        if let Some(subscriber) = self.detach() {
            debug!("Signalling completion");
            subscriber.on_complete();
        }
    }

    pub fn error(&self, error: Error) {
        if let Some(subscriber) = self.detach() {
            debug!("Signalling error: {}", error);
            subscriber.on_error(error);
        }
    }

    /// Stop all further signals without emitting a terminal one.
    pub fn shutdown(&self) {
        drop(self.detach());
    }

    /// Returns the subscriber to the first caller only.
    fn detach(&self) -> Option<Arc<dyn Subscriber>> {
        self.lock_subscriber().take()
    }

    fn lock_subscriber(&self) -> MutexGuard<'_, Option<Arc<dyn Subscriber>>> {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
