//! Per-event-type projection rules
//!
//! Every rule is a pure function of the event. Each extracts a fixed,
//! type-specific set of payload fields into tags; payload fields outside
//! that set are dropped. Absent fields simply omit their tag.

use crate::types::{millis_to_nanos, Event, MetricPoint};

/// The one-point-per-event baseline: counter field, `eventType` tag.
fn baseline(event: &Event) -> MetricPoint {
    MetricPoint::new(
        format!("event_bus_{}", event.event_type),
        millis_to_nanos(event.timestamp_ms),
    )
    .with_tag("eventType", event.event_type.as_str())
    .with_field("value", 1)
}

/// `event_stream_attached` / `event_stream_detached`
pub(super) fn event_stream(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event).with_tag_opt("remoteAddress", p.str_field("remoteAddress"))]
}

/// `app_terminated_event`
pub(super) fn app_terminated(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event).with_tag_opt("appId", p.str_field("appId"))]
}

/// `status_update_event`
pub(super) fn status_update(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("slaveId", p.str_field("slaveId"))
        .with_tag_opt("taskId", p.str_field("taskId"))
        .with_tag_opt("taskStatus", p.str_field("taskStatus"))
        .with_tag_opt("appId", p.str_field("appId"))
        .with_tag_opt("host", p.str_field("host"))
        .with_tag_opt("ports", p.json_field("ports"))
        .with_tag_opt("version", p.str_field("version"))]
}

/// `instance_changed_event`
pub(super) fn instance_changed(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("instanceId", p.str_field("instanceId"))
        .with_tag_opt("condition", p.str_field("condition"))
        .with_tag_opt("runSpecId", p.str_field("runSpecId"))
        .with_tag_opt("agentId", p.str_field("agentId"))
        .with_tag_opt("host", p.str_field("host"))
        .with_tag_opt("runSpecVersion", p.str_field("runSpecVersion"))]
}

/// `unknown_instance_terminated_event`
pub(super) fn unknown_instance_terminated(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("instanceId", p.str_field("instanceId"))
        .with_tag_opt("condition", p.str_field("condition"))
        .with_tag_opt("runSpecId", p.str_field("runSpecId"))]
}

/// `instance_health_changed_event`
pub(super) fn instance_health_changed(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("runSpecId", p.str_field("runSpecId"))
        .with_tag_opt("healthy", p.bool_field("healthy"))
        .with_tag_opt("runSpecVersion", p.str_field("runSpecVersion"))]
}

/// `framework_message_event`
pub(super) fn framework_message(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("slaveId", p.str_field("slaveId"))
        .with_tag_opt("executorId", p.str_field("executorId"))
        .with_tag_opt("message", p.str_field("message"))]
}

/// `add_health_check_event` / `remove_health_check_event`
pub(super) fn health_check_registration(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event).with_tag_opt("appId", p.str_field("appId"))]
}

/// `failed_health_check_event`
pub(super) fn failed_health_check(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("appId", p.str_field("appId"))
        .with_tag_opt("taskId", p.str_field("taskId"))]
}

/// `health_status_changed_event`
pub(super) fn health_status_changed(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("appId", p.str_field("appId"))
        .with_tag_opt("instanceId", p.str_field("instanceId"))
        .with_tag_opt("alive", p.bool_field("alive"))
        .with_tag_opt("version", p.str_field("version"))]
}

/// `unhealthy_task_kill_event`
pub(super) fn unhealthy_task_kill(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("appId", p.str_field("appId"))
        .with_tag_opt("taskId", p.str_field("taskId"))
        .with_tag_opt("reason", p.str_field("reason"))
        .with_tag_opt("host", p.str_field("host"))
        .with_tag_opt("slaveId", p.str_field("slaveId"))
        .with_tag_opt("version", p.str_field("version"))]
}

/// `unhealthy_instance_kill_event`
pub(super) fn unhealthy_instance_kill(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("appId", p.str_field("appId"))
        .with_tag_opt("taskId", p.str_field("taskId"))
        .with_tag_opt("instanceId", p.str_field("instanceId"))
        .with_tag_opt("reason", p.str_field("reason"))
        .with_tag_opt("host", p.str_field("host"))
        .with_tag_opt("slaveId", p.str_field("slaveId"))
        .with_tag_opt("version", p.str_field("version"))]
}

/// `group_change_success` / `group_change_failed`
pub(super) fn group_change(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event)
        .with_tag_opt("groupId", p.str_field("groupId"))
        .with_tag_opt("version", p.str_field("version"))]
}

/// `deployment_success` / `deployment_failed`
pub(super) fn deployment_result(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();
    vec![baseline(event).with_tag_opt("id", p.str_field("id"))]
}

/// `deployment_info` / `deployment_step_success` / `deployment_step_failure`
///
/// Composite events: one point per action of the current step, each carrying
/// the shared plan-level context. An empty action list yields zero points.
/// These points deliberately carry no `eventType` tag; the measurement name
/// already identifies the type.
pub(super) fn deployment_progress(event: &Event) -> Vec<MetricPoint> {
    let p = event.payload();

    let actions = match p
        .raw("currentStep")
        .and_then(|step| step.get("actions"))
        .and_then(|actions| actions.as_array())
    {
        Some(actions) => actions,
        None => return Vec::new(),
    };

    let plan = p.raw("plan");
    let plan_id = plan.and_then(|plan| plan.get("id")).and_then(|id| id.as_str());
    let plan_steps = plan.and_then(|plan| plan.get("steps")).map(|steps| steps.to_string());
    let current_step = p.json_field("currentStep");
    let measurement = format!("event_bus_{}", event.event_type);
    let timestamp_ns = millis_to_nanos(event.timestamp_ms);

    actions
        .iter()
        .map(|action| {
            MetricPoint::new(measurement.clone(), timestamp_ns)
                .with_tag_opt("plan_id", plan_id)
                .with_tag_opt("plan_steps", plan_steps.clone())
                .with_tag_opt("plan_currentStep", current_step.clone())
                .with_tag_opt("action", action.get("action").and_then(|a| a.as_str()))
                .with_tag_opt("app", action.get("app").and_then(|a| a.as_str()))
                .with_field("value", 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::projection::{Projection, ProjectionRegistry};
    use crate::types::{Event, MetricPoint, TagValue};
    use serde_json::json;

    fn project(event: &Event) -> Vec<MetricPoint> {
        match ProjectionRegistry::new().project(event) {
            Projection::Points(points) => points,
            Projection::Unmatched => panic!("expected a rule for {}", event.event_type),
        }
    }

    fn tag_keys(point: &MetricPoint) -> Vec<&str> {
        point.tags.keys().map(|k| k.as_str()).collect()
    }

    #[test]
    fn test_status_update_tag_set() {
        let event = Event::new(
            "status_update_event",
            1000,
            json!({
                "slaveId": "slave-1",
                "taskId": "app.instance-1",
                "taskStatus": "TASK_RUNNING",
                "appId": "/app",
                "host": "node-1.internal",
                "ports": [31000, 31001],
                "version": "2024-05-01T10:00:00.000Z",
                "ipAddresses": ["10.0.0.1"]
            }),
        );

        let points = project(&event);
        assert_eq!(points.len(), 1);
        let point = &points[0];

        assert_eq!(point.measurement, "event_bus_status_update_event");
        assert_eq!(
            tag_keys(point),
            vec!["appId", "eventType", "host", "ports", "slaveId", "taskId", "taskStatus", "version"]
        );
        // Structured ports list travels as one JSON-encoded tag value
        assert_eq!(
            point.tags.get("ports"),
            Some(&TagValue::Str("[31000,31001]".into()))
        );
        // Fields outside the fixed set (ipAddresses) are dropped
        assert!(!point.tags.contains_key("ipAddresses"));
    }

    #[test]
    fn test_absent_fields_omit_tags() {
        let event = Event::new("status_update_event", 1000, json!({"appId": "/app"}));
        let points = project(&event);

        assert_eq!(points.len(), 1);
        assert_eq!(tag_keys(&points[0]), vec!["appId", "eventType"]);
    }

    #[test]
    fn test_boolean_tags() {
        let event = Event::new(
            "health_status_changed_event",
            1000,
            json!({"appId": "/app", "instanceId": "i-1", "alive": false, "version": "v1"}),
        );
        let points = project(&event);
        assert_eq!(points[0].tags.get("alive"), Some(&TagValue::Bool(false)));

        let event = Event::new(
            "instance_health_changed_event",
            1000,
            json!({"runSpecId": "/app", "healthy": true, "runSpecVersion": "v1"}),
        );
        let points = project(&event);
        assert_eq!(points[0].tags.get("healthy"), Some(&TagValue::Bool(true)));
    }

    #[test]
    fn test_deployment_progress_fans_out_per_action() {
        let event = Event::new(
            "deployment_info",
            2000,
            json!({
                "plan": {
                    "id": "plan-1",
                    "steps": [{"actions": [{"action": "StartApplication", "app": "/a"}]}]
                },
                "currentStep": {
                    "actions": [
                        {"action": "StartApplication", "app": "/a"},
                        {"action": "ScaleApplication", "app": "/b"}
                    ]
                }
            }),
        );

        let points = project(&event);
        assert_eq!(points.len(), 2);

        for point in &points {
            assert_eq!(point.measurement, "event_bus_deployment_info");
            assert_eq!(point.timestamp_ns, 2_000_000_000);
            // Shared plan-level context, no eventType tag on composite points
            assert_eq!(
                point.tags.get("plan_id"),
                Some(&TagValue::Str("plan-1".into()))
            );
            assert!(point.tags.contains_key("plan_steps"));
            assert!(point.tags.contains_key("plan_currentStep"));
            assert!(!point.tags.contains_key("eventType"));
        }

        assert_eq!(
            points[0].tags.get("action"),
            Some(&TagValue::Str("StartApplication".into()))
        );
        assert_eq!(points[0].tags.get("app"), Some(&TagValue::Str("/a".into())));
        assert_eq!(
            points[1].tags.get("action"),
            Some(&TagValue::Str("ScaleApplication".into()))
        );
        assert_eq!(points[1].tags.get("app"), Some(&TagValue::Str("/b".into())));
    }

    #[test]
    fn test_deployment_progress_empty_actions() {
        let event = Event::new(
            "deployment_step_success",
            2000,
            json!({"plan": {"id": "plan-1", "steps": []}, "currentStep": {"actions": []}}),
        );
        assert!(project(&event).is_empty());
    }

    #[test]
    fn test_deployment_progress_missing_step() {
        let event = Event::new("deployment_step_failure", 2000, json!({"plan": {"id": "p"}}));
        assert!(project(&event).is_empty());
    }

    #[test]
    fn test_shared_rules_tag_both_types() {
        for event_type in ["group_change_success", "group_change_failed"] {
            let event = Event::new(event_type, 1000, json!({"groupId": "/g", "version": "v"}));
            let points = project(&event);
            assert_eq!(points[0].measurement, format!("event_bus_{}", event_type));
            assert_eq!(tag_keys(&points[0]), vec!["eventType", "groupId", "version"]);
        }
    }

    #[test]
    fn test_fixed_tag_set_per_type() {
        // A payload carrying every field any rule knows about; each type
        // must pick out exactly its own set plus eventType.
        let payload = json!({
            "remoteAddress": "10.1.2.3",
            "appId": "/app",
            "slaveId": "slave-1",
            "taskId": "task-1",
            "taskStatus": "TASK_RUNNING",
            "host": "node-1",
            "ports": [31000],
            "version": "v1",
            "instanceId": "i-1",
            "condition": "Running",
            "runSpecId": "/app",
            "agentId": "agent-1",
            "runSpecVersion": "v1",
            "healthy": true,
            "alive": true,
            "executorId": "exec-1",
            "message": "hello",
            "reason": "unhealthy",
            "groupId": "/group",
            "id": "d1"
        });

        let cases: &[(&str, &[&str])] = &[
            ("event_stream_attached", &["eventType", "remoteAddress"]),
            ("event_stream_detached", &["eventType", "remoteAddress"]),
            ("app_terminated_event", &["appId", "eventType"]),
            (
                "status_update_event",
                &["appId", "eventType", "host", "ports", "slaveId", "taskId", "taskStatus", "version"],
            ),
            (
                "instance_changed_event",
                &["agentId", "condition", "eventType", "host", "instanceId", "runSpecId", "runSpecVersion"],
            ),
            (
                "unknown_instance_terminated_event",
                &["condition", "eventType", "instanceId", "runSpecId"],
            ),
            (
                "instance_health_changed_event",
                &["eventType", "healthy", "runSpecId", "runSpecVersion"],
            ),
            (
                "framework_message_event",
                &["eventType", "executorId", "message", "slaveId"],
            ),
            ("add_health_check_event", &["appId", "eventType"]),
            ("remove_health_check_event", &["appId", "eventType"]),
            ("failed_health_check_event", &["appId", "eventType", "taskId"]),
            (
                "health_status_changed_event",
                &["alive", "appId", "eventType", "instanceId", "version"],
            ),
            (
                "unhealthy_task_kill_event",
                &["appId", "eventType", "host", "reason", "slaveId", "taskId", "version"],
            ),
            (
                "unhealthy_instance_kill_event",
                &["appId", "eventType", "host", "instanceId", "reason", "slaveId", "taskId", "version"],
            ),
            ("group_change_success", &["eventType", "groupId", "version"]),
            ("group_change_failed", &["eventType", "groupId", "version"]),
            ("deployment_success", &["eventType", "id"]),
            ("deployment_failed", &["eventType", "id"]),
        ];

        for (event_type, expected) in cases {
            let event = Event::new(*event_type, 1000, payload.clone());
            let points = project(&event);
            assert_eq!(points.len(), 1, "{} should emit one point", event_type);
            assert_eq!(
                tag_keys(&points[0]),
                *expected,
                "tag set mismatch for {}",
                event_type
            );
            assert_eq!(
                points[0].measurement,
                format!("event_bus_{}", event_type)
            );
        }
    }

    #[test]
    fn test_event_stream_remote_address() {
        let event = Event::new(
            "event_stream_attached",
            1000,
            json!({"remoteAddress": "10.1.2.3"}),
        );
        let points = project(&event);
        assert_eq!(
            points[0].tags.get("remoteAddress"),
            Some(&TagValue::Str("10.1.2.3".into()))
        );
    }
}
