//! InfluxDB 1.x sink
//!
//! Writes batches over the HTTP `/write` endpoint in line protocol with
//! nanosecond precision. A non-2xx response is a rejection; both rejection
//! and transport failures surface as [`SinkError`] for the pipeline to
//! report.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::MetricSink;
use crate::config::InfluxConfig;
use crate::error::SinkError;
use crate::types::{FieldValue, MetricPoint};

/// InfluxDB HTTP sink
pub struct InfluxSink {
    client: Client,
    write_url: String,
}

impl InfluxSink {
    /// Create a sink for the configured database
    pub fn new(config: &InfluxConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            write_url: config.write_url(),
        })
    }
}

#[async_trait]
impl MetricSink for InfluxSink {
    async fn write_batch(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        let body = encode_batch(points);
        let response = self.client.post(&self.write_url).body(body).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(SinkError::Rejected { status, body })
        }
    }
}

/// Encode a batch as newline-separated line protocol
pub fn encode_batch(points: &[MetricPoint]) -> String {
    let mut output = String::new();
    for point in points {
        encode_point(&mut output, point);
        output.push('\n');
    }
    output
}

fn encode_point(output: &mut String, point: &MetricPoint) {
    escape_measurement(output, &point.measurement);

    for (key, value) in &point.tags {
        output.push(',');
        escape_tag(output, key);
        output.push('=');
        escape_tag(output, &value.to_string());
    }

    output.push(' ');
    let mut first = true;
    for (key, value) in &point.fields {
        if !first {
            output.push(',');
        }
        first = false;
        escape_tag(output, key);
        match value {
            FieldValue::Int(i) => {
                let _ = write!(output, "={}i", i);
            }
            FieldValue::Float(f) => {
                let _ = write!(output, "={}", f);
            }
        }
    }

    let _ = write!(output, " {}", point.timestamp_ns);
}

/// Measurement names escape commas and spaces
fn escape_measurement(output: &mut String, s: &str) {
    for c in s.chars() {
        if c == ',' || c == ' ' {
            output.push('\\');
        }
        output.push(c);
    }
}

/// Tag keys, tag values and field keys escape commas, equals signs and spaces
fn escape_tag(output: &mut String, s: &str) {
    for c in s.chars() {
        if c == ',' || c == '=' || c == ' ' {
            output.push('\\');
        }
        output.push(c);
    }
}
