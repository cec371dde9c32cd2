//! Marathon event-bus → InfluxDB metrics bridge
//!
//! Subscribes to the orchestrator's lifecycle event stream and projects each
//! event into tagged, counted metric points, forwarded best-effort to
//! InfluxDB:
//!
//! ```text
//! ┌────────────┐    ┌──────────────────────┐    ┌────────────────────┐
//! │  Marathon  │───▶│ SubscriptionManager  │───▶│ ProjectionRegistry │
//! │ /v2/events │    │  (lifecycle.rs)      │    │  (projection/)     │
//! └────────────┘    └──────────────────────┘    └─────────┬──────────┘
//!                                                         │ points
//!                                                         ▼
//!                   ┌──────────────────────┐    ┌────────────────────┐
//!                   │      InfluxDB        │◀───│  DeliveryPipeline  │
//!                   │  /write (line proto) │    │  (pipeline.rs)     │
//!                   └──────────────────────┘    └────────────────────┘
//! ```
//!
//! The bridge transforms and forwards only: it stores nothing, deduplicates
//! nothing, and treats every failure as a reportable, per-event loss rather
//! than a reason to stall the stream.
//!
//! # Example
//!
//! ```rust,ignore
//! use marathon_event_bridge::{
//!     BridgeConfig, BridgeStats, DeliveryPipeline, InfluxSink, ProjectionRegistry,
//!     SseEventSource, SubscriptionManager,
//! };
//!
//! let config = BridgeConfig::load();
//! let stats = Arc::new(BridgeStats::new());
//! let sink = Arc::new(InfluxSink::new(&config.influx)?);
//! let pipeline = Arc::new(DeliveryPipeline::new(&config.pipeline, sink, stats.clone()));
//! let source = Arc::new(SseEventSource::new(&config.marathon)?);
//! let manager = SubscriptionManager::new(source, ProjectionRegistry::new(), pipeline, stats);
//!
//! manager.run(shutdown_rx).await?;
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod projection;
pub mod sink;
pub mod source;
pub mod stats;
pub mod types;

pub use config::{BridgeConfig, InfluxConfig, MarathonConfig, PipelineConfig};
pub use error::{ConfigError, Error, Result, SinkError, SourceError};
pub use lifecycle::{SubscriptionManager, SubscriptionPhase};
pub use pipeline::DeliveryPipeline;
pub use projection::{Projection, ProjectionRegistry, EVENT_TYPES};
pub use sink::{InfluxSink, MetricSink};
pub use source::{EventSource, SourceMessage, SourceSignal, SseEventSource};
pub use stats::{BridgeStats, StatsSnapshot};
pub use types::{Event, FieldValue, MetricPoint, Payload, TagValue};
