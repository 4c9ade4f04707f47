//! Subscribe/request/cancel surface of a [`FileReadSource`]

use crate::reader::ChunkReader;
use crate::source::{FileReadSource, Pipeline};
use crate::state::ReadState;
use readahead_types::{Publisher, Subscriber, Subscription};
use std::num::NonZeroU64;
use std::sync::Arc;
use tracing::debug;

/// Handle given to the subscriber of a [`FileReadSource`]
pub(crate) struct FileSubscription<R: ChunkReader> {
    pipeline: Arc<Pipeline<R>>,
}

impl<R: ChunkReader> Subscription for FileSubscription<R> {
    fn request(&self, n: i64) {
        // Non-positive demand is ignored rather than signalled as an error.
        let Some(n) = u64::try_from(n).ok().and_then(NonZeroU64::new) else {
            debug!("Ignoring request for {} chunks", n);
            return;
        };

        match self.pipeline.state.add_demand(n) {
            ReadState::Idle => self.pipeline.issue_read(),
            ReadState::NextBuffer(chunk) => {
                self.pipeline.dispatcher.next(chunk);
                self.pipeline.issue_read();
            }
            ReadState::Completed => self.pipeline.dispatcher.complete(),
            ReadState::PendingDemand(_) | ReadState::Cancelled => {}
        }
    }

    fn cancel(&self) {
        match self.pipeline.state.cancel() {
            ReadState::Cancelled => return,
            ReadState::NextBuffer(chunk) => {
                debug!("Dropping {} byte chunk held for demand", chunk.len());
            }
            _ => {}
        }
        self.pipeline.dispatcher.shutdown();
        self.pipeline.release();
        debug!("Subscription cancelled");
    }
}

impl<R: ChunkReader> Publisher for FileReadSource<R> {
    fn subscribe(self, subscriber: Arc<dyn Subscriber>) {
        let pipeline = self.into_pipeline(Arc::clone(&subscriber));
        let subscription = Arc::new(FileSubscription {
            pipeline: Arc::clone(&pipeline),
        });
        subscriber.on_subscribe(subscription);
    }
}
