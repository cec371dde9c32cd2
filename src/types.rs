//! Core data types shared across the bridge

use std::collections::BTreeMap;
use std::fmt;

/// Nanoseconds per millisecond, used when scaling event timestamps for the sink.
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Scale an epoch-millisecond timestamp to the nanosecond resolution the sink
/// expects. The sub-millisecond digits are zero padding, not measured precision.
pub fn millis_to_nanos(timestamp_ms: i64) -> i64 {
    timestamp_ms * NANOS_PER_MILLI
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single lifecycle event received from the orchestration control plane.
///
/// The wire timestamp is resolved to epoch milliseconds once at intake, so
/// projection never consults a clock and stays deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Discriminant from the closed event-type vocabulary.
    pub event_type: String,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    /// Open, type-specific payload. Only fields declared relevant for the
    /// event type are ever read.
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event
    pub fn new(
        event_type: impl Into<String>,
        timestamp_ms: i64,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp_ms,
            payload,
        }
    }

    /// Typed view over the payload for tag extraction
    pub fn payload(&self) -> Payload<'_> {
        Payload(&self.payload)
    }
}

/// Absence-tolerant typed accessors over an open payload.
///
/// Every accessor returns `Option` so a projection rule can request fields
/// that may be missing without failing.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a>(pub &'a serde_json::Value);

impl<'a> Payload<'a> {
    /// String field, if present and a string
    pub fn str_field(&self, name: &str) -> Option<&'a str> {
        self.0.get(name).and_then(|v| v.as_str())
    }

    /// Integer field, if present and numeric
    pub fn i64_field(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(|v| v.as_i64())
    }

    /// Boolean field, if present and a boolean
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(|v| v.as_bool())
    }

    /// Structured field serialized to its compact JSON representation.
    ///
    /// This is the single structured-to-scalar encoding step: lists and
    /// nested records travel as one tag value.
    pub fn json_field(&self, name: &str) -> Option<String> {
        self.0.get(name).map(|v| v.to_string())
    }

    /// Raw access to a nested value
    pub fn raw(&self, name: &str) -> Option<&'a serde_json::Value> {
        self.0.get(name)
    }
}

/// A tag value attached to a metric point
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Str(s) => f.write_str(s),
            TagValue::Int(i) => write!(f, "{}", i),
            TagValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

/// A field value attached to a metric point
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One time-stamped, tagged observation bound for the metrics store.
///
/// Tags and fields use `BTreeMap` so serialization order is deterministic and
/// projecting the same event twice yields bit-identical output.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    /// Measurement name, `event_bus_<eventType>`
    pub measurement: String,
    /// Indexed dimensions, fully determined by event type and payload
    pub tags: BTreeMap<String, TagValue>,
    /// Measured values; always carries at least `value = 1`
    pub fields: BTreeMap<String, FieldValue>,
    /// Epoch nanoseconds
    pub timestamp_ns: i64,
}

impl MetricPoint {
    /// Create an empty point for a measurement
    pub fn new(measurement: impl Into<String>, timestamp_ns: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ns,
        }
    }

    /// Attach a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Attach a tag only when the value is present; an absent payload field
    /// drops the tag rather than failing the projection.
    pub fn with_tag_opt<V>(self, key: impl Into<String>, value: Option<V>) -> Self
    where
        V: Into<TagValue>,
    {
        match value {
            Some(v) => self.with_tag(key, v),
            None => self,
        }
    }

    /// Attach a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_millis_to_nanos() {
        assert_eq!(millis_to_nanos(1000), 1_000_000_000);
        assert_eq!(millis_to_nanos(0), 0);
        assert_eq!(millis_to_nanos(1_234_567), 1_234_567_000_000);
    }

    #[test]
    fn test_payload_accessors() {
        let value = json!({
            "appId": "/my-app",
            "ports": [8080, 8081],
            "alive": true,
            "instances": 3
        });
        let payload = Payload(&value);

        assert_eq!(payload.str_field("appId"), Some("/my-app"));
        assert_eq!(payload.bool_field("alive"), Some(true));
        assert_eq!(payload.i64_field("instances"), Some(3));
        assert_eq!(payload.json_field("ports"), Some("[8080,8081]".to_string()));

        // Absent or mistyped fields are None, never an error
        assert_eq!(payload.str_field("missing"), None);
        assert_eq!(payload.str_field("instances"), None);
        assert_eq!(payload.bool_field("appId"), None);
    }

    #[test]
    fn test_tag_value_display() {
        assert_eq!(TagValue::Str("host-1".into()).to_string(), "host-1");
        assert_eq!(TagValue::Int(42).to_string(), "42");
        assert_eq!(TagValue::Bool(true).to_string(), "true");
        assert_eq!(TagValue::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_point_builder() {
        let point = MetricPoint::new("event_bus_test", 1_000_000_000)
            .with_tag("eventType", "test")
            .with_tag_opt("present", Some("yes"))
            .with_tag_opt("absent", None::<&str>)
            .with_field("value", 1);

        assert_eq!(point.measurement, "event_bus_test");
        assert_eq!(point.tags.len(), 2);
        assert!(point.tags.contains_key("present"));
        assert!(!point.tags.contains_key("absent"));
        assert_eq!(point.fields.get("value"), Some(&FieldValue::Int(1)));
    }
}
