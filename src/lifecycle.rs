//! Subscription lifecycle manager
//!
//! Owns the connection to the event source and drives the
//! projection → delivery chain:
//!
//! ```text
//! Disconnected ──▶ Subscribing ──▶ Subscribed ──▶ Unsubscribed
//!                                      │
//!                                      └────────▶ Errored
//! ```
//!
//! Events are handled one at a time in arrival order; projection completes
//! synchronously before the next message is taken, and only the sink write
//! is deferred (to the delivery pipeline's workers). Lifecycle signals are
//! idempotent and order-tolerant: an error arriving before the subscription
//! acknowledgment is recorded, never a panic.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::SourceError;
use crate::pipeline::DeliveryPipeline;
use crate::projection::{Projection, ProjectionRegistry, EVENT_TYPES};
use crate::source::{EventSource, SourceMessage, SourceSignal};
use crate::stats::BridgeStats;
use crate::types::Event;

/// How long to wait for trailing signals after requesting an unsubscribe
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection phase of the subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionPhase {
    Disconnected,
    Subscribing,
    Subscribed,
    Unsubscribed,
    Errored,
}

/// Mutable lifecycle state, owned exclusively by the manager
#[derive(Debug, Clone)]
struct SubscriptionState {
    phase: SubscriptionPhase,
    last_error: Option<String>,
}

/// Keeps the event source connected and feeds every received event through
/// projection and delivery
pub struct SubscriptionManager {
    source: Arc<dyn EventSource>,
    registry: ProjectionRegistry,
    pipeline: Arc<DeliveryPipeline>,
    stats: Arc<BridgeStats>,
    state: RwLock<SubscriptionState>,
}

impl SubscriptionManager {
    /// Create a manager wired to its collaborators
    pub fn new(
        source: Arc<dyn EventSource>,
        registry: ProjectionRegistry,
        pipeline: Arc<DeliveryPipeline>,
        stats: Arc<BridgeStats>,
    ) -> Self {
        Self {
            source,
            registry,
            pipeline,
            stats,
            state: RwLock::new(SubscriptionState {
                phase: SubscriptionPhase::Disconnected,
                last_error: None,
            }),
        }
    }

    /// Current connection phase
    pub fn phase(&self) -> SubscriptionPhase {
        self.state.read().phase.clone()
    }

    /// Detail of the last source error, if any
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    fn set_phase(&self, phase: SubscriptionPhase) {
        self.state.write().phase = phase;
    }

    /// Subscribe and process messages until shutdown or the stream ends.
    ///
    /// Source-level errors received on the stream are recorded, not
    /// returned: only a failure to establish the subscription is an error
    /// here.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SourceError> {
        self.set_phase(SubscriptionPhase::Subscribing);
        info!(event_types = EVENT_TYPES.len(), "Subscribing to the event bus");

        let mut messages = match self.source.subscribe(&EVENT_TYPES).await {
            Ok(messages) => messages,
            Err(e) => {
                self.state.write().phase = SubscriptionPhase::Disconnected;
                return Err(e);
            }
        };

        loop {
            tokio::select! {
                result = shutdown.recv() => {
                    match result {
                        Ok(()) | Err(broadcast::error::RecvError::Closed) => {
                            info!("Shutdown signal received, unsubscribing");
                            self.source.unsubscribe();
                            self.drain(&mut messages).await;
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            debug!(missed = n, "Shutdown receiver lagged");
                        }
                    }
                }

                message = messages.recv() => {
                    match message {
                        Some(SourceMessage::Event(event)) => self.handle_event(&event),
                        Some(SourceMessage::Signal(signal)) => self.handle_signal(signal),
                        None => {
                            warn!("Event source stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Consume trailing messages (typically the unsubscribe acknowledgment)
    /// so the final phase reflects the last signal seen
    async fn drain(&self, messages: &mut tokio::sync::mpsc::Receiver<SourceMessage>) {
        while let Ok(Some(message)) = tokio::time::timeout(DRAIN_TIMEOUT, messages.recv()).await {
            match message {
                SourceMessage::Event(event) => self.handle_event(&event),
                SourceMessage::Signal(signal) => {
                    let done = matches!(signal, SourceSignal::Unsubscribed);
                    self.handle_signal(signal);
                    if done {
                        break;
                    }
                }
            }
        }
    }

    fn handle_event(&self, event: &Event) {
        self.stats.record_event();
        match self.registry.project(event) {
            Projection::Points(points) => self.pipeline.dispatch(points),
            Projection::Unmatched => self.stats.record_unmatched(),
        }
    }

    fn handle_signal(&self, signal: SourceSignal) {
        match signal {
            SourceSignal::Subscribed => {
                info!("Subscribed to the event bus");
                self.set_phase(SubscriptionPhase::Subscribed);
            }
            SourceSignal::Unsubscribed => {
                info!("Unsubscribed from the event bus");
                self.set_phase(SubscriptionPhase::Unsubscribed);
            }
            SourceSignal::Error { timestamp_ms, detail } => {
                error!(timestamp_ms, detail = %detail, "Event source reported an error");
                let mut state = self.state.write();
                state.phase = SubscriptionPhase::Errored;
                state.last_error = Some(detail);
            }
        }
    }
}
