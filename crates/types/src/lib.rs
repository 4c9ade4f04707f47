//! Publish/subscribe boundary shared by `readahead` sources and their consumers.
//!
//! The contract mirrors the usual reactive-streams shape:
//!
//! - A [`Publisher`] is subscribed exactly once. `subscribe` consumes it, so a
//!   second subscription does not compile.
//! - The publisher hands the [`Subscriber`] a [`Subscription`] synchronously,
//!   from inside `subscribe`, via [`Subscriber::on_subscribe`].
//! - The subscriber signals cumulative demand with [`Subscription::request`].
//!   The publisher never emits more `on_next` signals than were requested.
//! - `on_next` is signalled zero or more times, strictly in order, followed by
//!   at most one of `on_complete` or `on_error`.
//!
//! Signals for one subscription never overlap, but they may arrive on any
//! thread, so subscribers take `&self` and manage their own interior state.

mod error;

use bytes::Bytes;
use std::sync::Arc;

pub use error::{Error, Result};

/// Consumer-facing handle for one subscription.
pub trait Subscription: Send + Sync {
    /// Signal demand for `n` more chunks. Demand accumulates across calls.
    ///
    /// Non-positive values are ignored.
    fn request(&self, n: i64);

    /// Signal that the subscriber is no longer interested.
    ///
    /// After `cancel` returns no new reads are started and held resources are
    /// released. A signal that was already being delivered may still arrive.
    fn cancel(&self);
}

/// Receives the signals of one subscription.
pub trait Subscriber: Send + Sync + 'static {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    fn on_next(&self, chunk: Bytes);

    fn on_error(&self, error: Error);

    fn on_complete(&self);
}

/// A single-use source of byte chunks.
pub trait Publisher {
    fn subscribe(self, subscriber: Arc<dyn Subscriber>);
}
