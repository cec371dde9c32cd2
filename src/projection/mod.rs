//! Event classification and projection
//!
//! Maps each lifecycle event to its metric points through a registry of pure
//! per-type rules:
//!
//! ```text
//! ┌─────────┐     ┌────────────────────┐     ┌───────────────────┐
//! │  Event  │────▶│ ProjectionRegistry │────▶│ Vec<MetricPoint>  │
//! └─────────┘     │  eventType → rule  │     └───────────────────┘
//!                 └─────────┬──────────┘
//!                           │ no rule
//!                           ▼
//!                 diagnostic, zero points
//! ```
//!
//! The registry is built once at startup and never mutated. Rules are pure
//! functions of the event; the only side effect in this module is the
//! diagnostic emitted on the fallback path, so classification gaps degrade
//! to observability instead of failures.

pub mod rules;

use std::collections::HashMap;

use tracing::warn;

use crate::types::{Event, MetricPoint};

/// A pure mapping from one event to its metric points
pub type ProjectionRule = fn(&Event) -> Vec<MetricPoint>;

/// The closed event-type vocabulary the bridge subscribes to.
///
/// Note that not every subscribed type has a projection rule; see
/// [`ProjectionRegistry::new`].
pub const EVENT_TYPES: [&str; 29] = [
    "pod_created_event",
    "pod_updated_event",
    "pod_deleted_event",
    "scheduler_registered_event",
    "scheduler_reregistered_event",
    "scheduler_disconnected_event",
    "subscribe_event",
    "unsubscribe_event",
    "event_stream_attached",
    "event_stream_detached",
    "add_health_check_event",
    "remove_health_check_event",
    "failed_health_check_event",
    "health_status_changed_event",
    "unhealthy_task_kill_event",
    "unhealthy_instance_kill_event",
    "group_change_success",
    "group_change_failed",
    "deployment_success",
    "deployment_failed",
    "deployment_info",
    "deployment_step_success",
    "deployment_step_failure",
    "app_terminated_event",
    "status_update_event",
    "instance_changed_event",
    "unknown_instance_terminated_event",
    "instance_health_changed_event",
    "framework_message_event",
];

/// Outcome of projecting a single event
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// The event matched a rule; deliver these points (possibly zero for
    /// composite events with an empty action list)
    Points(Vec<MetricPoint>),
    /// No rule for this event type; a diagnostic was emitted and nothing is
    /// delivered
    Unmatched,
}

/// Static registry mapping event types to projection rules
pub struct ProjectionRegistry {
    rules: HashMap<&'static str, ProjectionRule>,
}

impl ProjectionRegistry {
    /// Build the rule registry.
    ///
    /// The registry intentionally covers fewer types than [`EVENT_TYPES`]:
    /// the `pod_*`, `scheduler_*`, `subscribe_event` and `unsubscribe_event`
    /// types are subscribed to but carry no tag-extraction contract, and
    /// route to the fallback path.
    pub fn new() -> Self {
        let mut rules: HashMap<&'static str, ProjectionRule> = HashMap::new();

        rules.insert("event_stream_attached", rules::event_stream as ProjectionRule);
        rules.insert("event_stream_detached", rules::event_stream);
        rules.insert("app_terminated_event", rules::app_terminated);
        rules.insert("status_update_event", rules::status_update);
        rules.insert("instance_changed_event", rules::instance_changed);
        rules.insert(
            "unknown_instance_terminated_event",
            rules::unknown_instance_terminated,
        );
        rules.insert("instance_health_changed_event", rules::instance_health_changed);
        rules.insert("framework_message_event", rules::framework_message);
        rules.insert("add_health_check_event", rules::health_check_registration);
        rules.insert("remove_health_check_event", rules::health_check_registration);
        rules.insert("failed_health_check_event", rules::failed_health_check);
        rules.insert("health_status_changed_event", rules::health_status_changed);
        rules.insert("unhealthy_task_kill_event", rules::unhealthy_task_kill);
        rules.insert("unhealthy_instance_kill_event", rules::unhealthy_instance_kill);
        rules.insert("group_change_success", rules::group_change);
        rules.insert("group_change_failed", rules::group_change);
        rules.insert("deployment_success", rules::deployment_result);
        rules.insert("deployment_failed", rules::deployment_result);
        rules.insert("deployment_info", rules::deployment_progress);
        rules.insert("deployment_step_success", rules::deployment_progress);
        rules.insert("deployment_step_failure", rules::deployment_progress);

        Self { rules }
    }

    /// Project one event into metric points.
    ///
    /// An event type without a rule emits a single diagnostic carrying the
    /// type and raw payload, and produces no points.
    pub fn project(&self, event: &Event) -> Projection {
        match self.rules.get(event.event_type.as_str()) {
            Some(rule) => Projection::Points(rule(event)),
            None => {
                warn!(
                    event_type = %event.event_type,
                    payload = %event.payload,
                    "No projection rule for event"
                );
                Projection::Unmatched
            }
        }
    }

    /// Whether an event type has a projection rule
    pub fn handles(&self, event_type: &str) -> bool {
        self.rules.contains_key(event_type)
    }
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagValue;
    use serde_json::json;

    fn project_points(event: &Event) -> Vec<MetricPoint> {
        match ProjectionRegistry::new().project(event) {
            Projection::Points(points) => points,
            Projection::Unmatched => panic!("expected a rule for {}", event.event_type),
        }
    }

    #[test]
    fn test_deployment_success_end_to_end() {
        let event = Event::new("deployment_success", 1000, json!({"id": "d1"}));
        let points = project_points(&event);

        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement, "event_bus_deployment_success");
        assert_eq!(point.timestamp_ns, 1_000_000_000);
        assert_eq!(point.tags.len(), 2);
        assert_eq!(
            point.tags.get("eventType"),
            Some(&TagValue::Str("deployment_success".into()))
        );
        assert_eq!(point.tags.get("id"), Some(&TagValue::Str("d1".into())));
        assert_eq!(point.fields.len(), 1);
    }

    #[test]
    fn test_unknown_type_is_unmatched() {
        let registry = ProjectionRegistry::new();
        let event = Event::new("totally_unknown", 1000, json!({}));
        assert_eq!(registry.project(&event), Projection::Unmatched);
    }

    #[test]
    fn test_subscribed_types_without_rules_fall_back() {
        // These are in the subscription vocabulary but carry no
        // tag-extraction contract, so they route to the fallback.
        let registry = ProjectionRegistry::new();
        for event_type in [
            "pod_created_event",
            "pod_updated_event",
            "pod_deleted_event",
            "scheduler_registered_event",
            "scheduler_reregistered_event",
            "scheduler_disconnected_event",
            "subscribe_event",
            "unsubscribe_event",
        ] {
            assert!(EVENT_TYPES.contains(&event_type));
            let event = Event::new(event_type, 1000, json!({}));
            assert_eq!(registry.project(&event), Projection::Unmatched);
        }
    }

    #[test]
    fn test_vocabulary_rule_coverage() {
        let unruled = [
            "pod_created_event",
            "pod_updated_event",
            "pod_deleted_event",
            "scheduler_registered_event",
            "scheduler_reregistered_event",
            "scheduler_disconnected_event",
            "subscribe_event",
            "unsubscribe_event",
        ];

        let registry = ProjectionRegistry::new();
        for event_type in EVENT_TYPES {
            assert_eq!(
                registry.handles(event_type),
                !unruled.contains(&event_type),
                "unexpected rule coverage for {}",
                event_type
            );
        }
    }

    #[test]
    fn test_projection_is_idempotent() {
        let event = Event::new(
            "status_update_event",
            1_660_000_000_000,
            json!({
                "slaveId": "s1",
                "taskId": "t1",
                "taskStatus": "TASK_RUNNING",
                "appId": "/app",
                "host": "node-1",
                "ports": [31000, 31001],
                "version": "2024-01-01T00:00:00.000Z"
            }),
        );
        let registry = ProjectionRegistry::new();
        assert_eq!(registry.project(&event), registry.project(&event));
    }

    #[test]
    fn test_timestamp_law() {
        for ms in [0_i64, 1, 1000, 1_660_000_000_000] {
            let event = Event::new("app_terminated_event", ms, json!({"appId": "/a"}));
            for point in project_points(&event) {
                assert_eq!(point.timestamp_ns, ms * 1_000_000);
            }
        }
    }
}
