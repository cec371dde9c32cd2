//! Metrics sink boundary
//!
//! The delivery pipeline only knows this trait; the production
//! implementation is the InfluxDB HTTP sink in [`influx`].

pub mod influx;

pub use influx::InfluxSink;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::types::MetricPoint;

/// A store accepting batched point writes.
///
/// One call carries all points derived from one source event; the sink has
/// no notion of event boundaries beyond that grouping.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Write one batch of points
    async fn write_batch(&self, points: &[MetricPoint]) -> Result<(), SinkError>;
}
