//! Marathon event-bus client
//!
//! Subscribes to the `/v2/events` server-sent-events stream and decodes each
//! frame into an [`Event`]. Frames whose event name is outside the
//! subscribed set are skipped; comment lines (Marathon's keep-alives) are
//! ignored. Reconnection on stream loss is a transport-level concern and is
//! deliberately not handled here: the stream task reports an error signal
//! and ends.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{EventSource, SourceMessage, SourceSignal};
use crate::config::MarathonConfig;
use crate::error::SourceError;
use crate::types::{now_ms, Event};

/// Capacity of the signal/event channel handed to the subscriber
const CHANNEL_CAPACITY: usize = 256;

/// SSE client for the Marathon event bus
pub struct SseEventSource {
    client: Client,
    events_url: String,
    cancel: CancellationToken,
}

impl SseEventSource {
    /// Create a client for the configured endpoint
    pub fn new(config: &MarathonConfig) -> Result<Self, SourceError> {
        // Connect timeout only: the event stream itself is long-lived.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            events_url: config.events_url(),
            cancel: CancellationToken::new(),
        })
    }
}

#[async_trait]
impl EventSource for SseEventSource {
    async fn subscribe(
        &self,
        event_types: &[&'static str],
    ) -> Result<mpsc::Receiver<SourceMessage>, SourceError> {
        let response = self
            .client
            .get(&self.events_url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let subscribed: HashSet<&'static str> = event_types.iter().copied().collect();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let _ = tx.send(SourceMessage::Signal(SourceSignal::Subscribed)).await;

            let mut stream = response.bytes_stream();
            let mut parser = FrameParser::new();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = tx
                            .send(SourceMessage::Signal(SourceSignal::Unsubscribed))
                            .await;
                        return;
                    }

                    chunk = stream.next() => {
                        let bytes = match chunk {
                            Some(Ok(bytes)) => bytes,
                            Some(Err(e)) => {
                                let _ = tx
                                    .send(SourceMessage::Signal(SourceSignal::Error {
                                        timestamp_ms: now_ms(),
                                        detail: e.to_string(),
                                    }))
                                    .await;
                                return;
                            }
                            None => {
                                let _ = tx
                                    .send(SourceMessage::Signal(SourceSignal::Error {
                                        timestamp_ms: now_ms(),
                                        detail: "event stream closed by server".to_string(),
                                    }))
                                    .await;
                                return;
                            }
                        };

                        for frame in parser.push(&bytes) {
                            if !subscribed.contains(frame.event.as_str()) {
                                debug!(event_type = %frame.event, "Skipping unsubscribed event type");
                                continue;
                            }
                            match decode_event(&frame) {
                                Some(event) => {
                                    if tx.send(SourceMessage::Event(event)).await.is_err() {
                                        // Subscriber went away; stop reading.
                                        return;
                                    }
                                }
                                None => {
                                    warn!(event_type = %frame.event, "Undecodable event payload, skipping");
                                }
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    fn unsubscribe(&self) {
        self.cancel.cancel();
    }
}

/// One complete server-sent event
#[derive(Debug, Clone, PartialEq)]
struct SseFrame {
    event: String,
    data: String,
}

/// Incremental SSE frame parser.
///
/// Frames arrive as arbitrary byte chunks; lines are only interpreted once
/// their terminating newline is seen, and a frame is emitted on the blank
/// line that ends it.
struct FrameParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameParser {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            event: None,
            data: Vec::new(),
        }
    }

    /// Feed a chunk, returning every frame it completes
    fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw[..newline]);
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event = Some(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data
                    .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            } else if line.starts_with(':') {
                // Comment line, used by the server as a keep-alive
            }
            // Other SSE fields (id:, retry:) are not used by the event bus
        }
        frames
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        let data = self.data.join("\n");
        self.data.clear();
        let event = self.event.take()?;
        if data.is_empty() {
            return None;
        }
        Some(SseFrame { event, data })
    }
}

/// Decode one frame into an event, resolving the wire timestamp at intake
fn decode_event(frame: &SseFrame) -> Option<Event> {
    let payload: serde_json::Value = serde_json::from_str(&frame.data).ok()?;
    let timestamp_ms = resolve_timestamp(&payload);
    Some(Event::new(frame.event.clone(), timestamp_ms, payload))
}

/// Resolve the payload timestamp to epoch milliseconds.
///
/// The event bus sends RFC 3339 strings; numeric timestamps are taken as
/// epoch milliseconds. A missing or unparseable timestamp falls back to the
/// intake time so the point is still placeable.
fn resolve_timestamp(payload: &serde_json::Value) -> i64 {
    match payload.get("timestamp") {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_else(now_ms),
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.timestamp_millis())
            .unwrap_or_else(|_| now_ms()),
        _ => now_ms(),
    }
}
