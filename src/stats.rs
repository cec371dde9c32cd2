//! Process-wide bridge counters
//!
//! Atomic counters covering the three failure classes (classification gaps,
//! dropped batches, failed writes) plus throughput. Counting is purely
//! observational and never gates pipeline behavior.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters for the bridge process
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Events received from the source
    events_received: AtomicU64,

    /// Events without a projection rule (classification gaps)
    events_unmatched: AtomicU64,

    /// Batches accepted onto the delivery queue
    batches_enqueued: AtomicU64,

    /// Batches dropped because the delivery queue was full
    batches_dropped: AtomicU64,

    /// Points successfully written to the sink
    points_written: AtomicU64,

    /// Failed sink writes (the batch is lost)
    write_errors: AtomicU64,
}

impl BridgeStats {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unmatched(&self) {
        self.events_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_enqueued(&self) {
        self.batches_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_points_written(&self, count: u64) {
        self.points_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_unmatched: self.events_unmatched.load(Ordering::Relaxed),
            batches_enqueued: self.batches_enqueued.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the bridge counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub events_received: u64,
    pub events_unmatched: u64,
    pub batches_enqueued: u64,
    pub batches_dropped: u64,
    pub points_written: u64,
    pub write_errors: u64,
}

impl StatsSnapshot {
    /// Render the snapshot in Prometheus text exposition format
    pub fn to_prometheus(&self, prefix: &str) -> String {
        let counters = [
            (
                "events_received_total",
                "Total events received from the event bus",
                self.events_received,
            ),
            (
                "events_unmatched_total",
                "Total events without a projection rule",
                self.events_unmatched,
            ),
            (
                "batches_enqueued_total",
                "Total point batches queued for delivery",
                self.batches_enqueued,
            ),
            (
                "batches_dropped_total",
                "Total point batches dropped due to a full delivery queue",
                self.batches_dropped,
            ),
            (
                "points_written_total",
                "Total metric points written to the store",
                self.points_written,
            ),
            (
                "write_errors_total",
                "Total failed store writes",
                self.write_errors,
            ),
        ];

        let mut output = String::new();
        for (name, help, value) in counters {
            let _ = writeln!(output, "# HELP {}_{} {}", prefix, name, help);
            let _ = writeln!(output, "# TYPE {}_{} counter", prefix, name);
            let _ = writeln!(output, "{}_{} {}\n", prefix, name, value);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = BridgeStats::new();
        stats.record_event();
        stats.record_event();
        stats.record_unmatched();
        stats.record_batch_enqueued();
        stats.record_batch_dropped();
        stats.record_points_written(5);
        stats.record_write_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_received, 2);
        assert_eq!(snapshot.events_unmatched, 1);
        assert_eq!(snapshot.batches_enqueued, 1);
        assert_eq!(snapshot.batches_dropped, 1);
        assert_eq!(snapshot.points_written, 5);
        assert_eq!(snapshot.write_errors, 1);
    }

    #[test]
    fn test_prometheus_export() {
        let stats = BridgeStats::new();
        stats.record_event();
        stats.record_points_written(3);

        let output = stats.snapshot().to_prometheus("event_bridge");

        assert!(output.contains("# HELP event_bridge_events_received_total"));
        assert!(output.contains("# TYPE event_bridge_events_received_total counter"));
        assert!(output.contains("event_bridge_events_received_total 1"));
        assert!(output.contains("event_bridge_points_written_total 3"));
        assert!(output.contains("event_bridge_write_errors_total 0"));
    }
}
