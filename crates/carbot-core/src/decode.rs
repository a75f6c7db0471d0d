//! Wire field resolution.
//!
//! The backend has shipped the same concept under several field names across
//! revisions (the status code alone appears as `status_clave`, `move_clave`,
//! and `obstacle_clave`). Each concept resolves through one ordered list of
//! candidate fields, applied uniformly here and nowhere else:
//!
//! - code:      `status_clave`, `move_clave`, `obstacle_clave`
//! - identity:  `event_id`, `id`
//! - timestamp: `event_at`, `created_at`
//! - distance:  `distance_cm`
//!
//! The `id` field is deliberately NOT a code fallback: it is the event's row
//! id and feeds identity only.
//!
//! Numeric fields accept both JSON numbers and numeric strings, since the
//! backend is inconsistent about quoting.

use serde_json::Value;

use crate::{Channel, DeviceId, EventRecord, EventTime};

pub const CODE_FIELDS: &[&str] = &["status_clave", "move_clave", "obstacle_clave"];
pub const IDENTITY_FIELDS: &[&str] = &["event_id", "id"];
pub const TIMESTAMP_FIELDS: &[&str] = &["event_at", "created_at"];
pub const DISTANCE_FIELD: &str = "distance_cm";

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First present numeric value among `fields`.
pub fn first_i64(payload: &Value, fields: &[&str]) -> Option<i64> {
    fields.iter().find_map(|f| payload.get(f).and_then(as_i64))
}

/// First present, parseable timestamp among `fields`.
pub fn first_time(payload: &Value, fields: &[&str]) -> Option<EventTime> {
    fields
        .iter()
        .find_map(|f| payload.get(f).and_then(Value::as_str).and_then(EventTime::parse))
}

fn subject_fields(channel: Channel) -> &'static [&'static str] {
    match channel {
        Channel::Movement | Channel::Obstacle => &["device_id"],
        // Demo-run progress is scoped to the sequence; older payloads only
        // carry the device that runs it.
        Channel::DemoRun => &["sequence_id", "device_id"],
    }
}

/// Locate the payload fragment carrying a demo run's current step.
///
/// Backends have shipped three shapes: a `steps` array whose head is the
/// executing step, a `current_step` object, or the code flat on the event
/// itself.
pub fn demo_progress_step(payload: &Value) -> &Value {
    if let Some(head) = payload.get("steps").and_then(|s| s.as_array()).and_then(|s| s.first()) {
        return head;
    }
    if let Some(step) = payload.get("current_step") {
        return step;
    }
    payload
}

/// Decode a backend event payload into an `EventRecord`.
///
/// Total over well-formed JSON: missing fields become `None` (a record
/// without a code renders as unknown downstream, it is not an error), and a
/// missing subject decodes as device zero. The arrival sequence is assigned
/// later, when the record enters a session.
pub fn decode_event(channel: Channel, payload: &Value) -> EventRecord {
    let subject = first_i64(payload, subject_fields(channel))
        .and_then(|id| u32::try_from(id).ok())
        .map(DeviceId::new)
        .unwrap_or(DeviceId::ZERO);

    let code_source = match channel {
        Channel::DemoRun => demo_progress_step(payload),
        _ => payload,
    };

    let mut record = EventRecord::new(channel, subject);
    record.code = first_i64(code_source, CODE_FIELDS);
    record.occurred_at =
        first_time(payload, TIMESTAMP_FIELDS).or_else(|| first_time(code_source, TIMESTAMP_FIELDS));
    record.distance_cm = payload.get(DISTANCE_FIELD).and_then(as_f64);
    record.server_id = first_i64(payload, IDENTITY_FIELDS).and_then(|id| u64::try_from(id).ok());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_resolution_order() {
        let payload = json!({"move_clave": 2, "status_clave": 1, "device_id": 1});
        let record = decode_event(Channel::Movement, &payload);
        assert_eq!(record.code, Some(1));

        let payload = json!({"obstacle_clave": 4, "device_id": 1});
        let record = decode_event(Channel::Obstacle, &payload);
        assert_eq!(record.code, Some(4));
    }

    #[test]
    fn test_id_is_identity_not_code() {
        let payload = json!({"id": 523, "device_id": 1});
        let record = decode_event(Channel::Movement, &payload);
        assert_eq!(record.code, None);
        assert_eq!(record.server_id, Some(523));
    }

    #[test]
    fn test_event_id_preferred_over_id() {
        let payload = json!({"event_id": 7, "id": 523, "device_id": 1});
        let record = decode_event(Channel::Movement, &payload);
        assert_eq!(record.server_id, Some(7));
    }

    #[test]
    fn test_timestamp_fallback() {
        let payload = json!({"created_at": "2024-03-01 10:00:00", "device_id": 1});
        let record = decode_event(Channel::Movement, &payload);
        assert_eq!(record.occurred_at.unwrap().render(), "2024-03-01 10:00:00");
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let payload = json!({"status_clave": "8", "device_id": "3", "distance_cm": "25.5"});
        let record = decode_event(Channel::Obstacle, &payload);
        assert_eq!(record.code, Some(8));
        assert_eq!(record.subject, DeviceId::new(3));
        assert_eq!(record.distance_cm, Some(25.5));
    }

    #[test]
    fn test_missing_everything_still_decodes() {
        let record = decode_event(Channel::Movement, &json!({}));
        assert_eq!(record.code, None);
        assert_eq!(record.occurred_at, None);
        assert_eq!(record.subject, DeviceId::ZERO);
    }

    #[test]
    fn test_demo_progress_from_steps_head() {
        let payload = json!({
            "sequence_id": 12,
            "steps": [{"status_clave": 8, "duration_ms": 500}, {"status_clave": 1}]
        });
        let record = decode_event(Channel::DemoRun, &payload);
        assert_eq!(record.code, Some(8));
        assert_eq!(record.subject, DeviceId::new(12));
    }

    #[test]
    fn test_demo_progress_from_current_step() {
        let payload = json!({"sequence_id": 12, "current_step": {"status_clave": 9}});
        let record = decode_event(Channel::DemoRun, &payload);
        assert_eq!(record.code, Some(9));
    }

    #[test]
    fn test_demo_progress_flat() {
        let payload = json!({"sequence_id": 12, "status_clave": 3});
        let record = decode_event(Channel::DemoRun, &payload);
        assert_eq!(record.code, Some(3));
    }
}
