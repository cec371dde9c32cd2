//! Event source boundary
//!
//! The subscription lifecycle manager only knows this trait; the production
//! implementation is the Marathon SSE client in [`sse`]. A subscription
//! yields one channel carrying both lifecycle signals and decoded events, in
//! arrival order.

pub mod sse;

pub use sse::SseEventSource;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SourceError;
use crate::types::Event;

/// Lifecycle signal raised by the source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSignal {
    /// The subscription was acknowledged
    Subscribed,
    /// The subscription ended gracefully
    Unsubscribed,
    /// The source reported an asynchronous error
    Error { timestamp_ms: i64, detail: String },
}

/// One message from the source stream
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMessage {
    Signal(SourceSignal),
    Event(Event),
}

/// The upstream system emitting the event stream
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Establish a subscription for the given event types.
    ///
    /// On success the returned channel carries signals and events until the
    /// subscription ends; connection-establishment failures are returned
    /// directly.
    async fn subscribe(
        &self,
        event_types: &[&'static str],
    ) -> Result<mpsc::Receiver<SourceMessage>, SourceError>;

    /// Request a graceful end of the subscription
    fn unsubscribe(&self);
}
