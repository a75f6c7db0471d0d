//! REST envelope and push frame decoding.
//!
//! The backend wraps REST responses in `{"ok": bool, "data": ...}` and ships
//! push events as one JSON text frame per event: `{"event": "<name>",
//! "data": {...}}`. Record fields resolve through the ordered rules in
//! `carbot_core::decode`.

use serde_json::Value;

use carbot_core::{
    decode_event, first_i64, Channel, CreatedSequence, EventRecord, PanelError, PanelResult,
    SequenceId, SequenceSummary,
};

use crate::PushEvent;

/// Unwrap a REST envelope into its `data` payload. A bare payload (older
/// backend revisions) passes through unchanged.
pub fn data_of(envelope: Value) -> PanelResult<Value> {
    match envelope {
        Value::Object(ref map) if map.contains_key("data") || map.contains_key("ok") => {
            if map.get("ok").and_then(Value::as_bool) == Some(false) {
                let msg = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("backend reported failure");
                return Err(PanelError::Transport(msg.to_string()));
            }
            Ok(map.get("data").cloned().unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

/// Decode one push frame. `Ok(None)` for event names the panel does not
/// consume (`server_info`, `demo:new`, ...); `Err` only for unparseable
/// frames.
pub fn decode_push_frame(text: &str) -> PanelResult<Option<PushEvent>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| PanelError::Decode(e.to_string()))?;
    let Some(name) = value.get("event").and_then(Value::as_str) else {
        return Err(PanelError::Decode(String::from("push frame missing event name")));
    };
    let Some(channel) = Channel::from_push_event_name(name) else {
        return Ok(None);
    };
    let data = value.get("data").cloned().unwrap_or(Value::Null);
    Ok(Some(PushEvent {
        channel,
        record: decode_event(channel, &data),
    }))
}

/// Decode a single-record read; `Null` means the backend has no history.
pub fn decode_record(channel: Channel, data: &Value) -> Option<EventRecord> {
    if data.is_null() {
        return None;
    }
    Some(decode_event(channel, data))
}

/// Decode a record list, preserving the backend's newest-first order.
pub fn decode_record_list(channel: Channel, data: &Value) -> Vec<EventRecord> {
    data.as_array()
        .map(|rows| rows.iter().map(|row| decode_event(channel, row)).collect())
        .unwrap_or_default()
}

/// Decode the sequence listing. Rows without an id are dropped.
pub fn decode_sequence_list(data: &Value) -> Vec<SequenceSummary> {
    let Some(rows) = data.as_array() else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let id = first_i64(row, &["sequence_id", "id"])
                .and_then(|id| u64::try_from(id).ok())
                .map(SequenceId::new)?;
            let name = row
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let steps_count = first_i64(row, &["steps_count"]).and_then(|n| u32::try_from(n).ok());
            Some(SequenceSummary {
                id,
                name,
                steps_count,
            })
        })
        .collect()
}

/// Decode a create response. The backend echoes the stored name; when it
/// does not, the requested name is assumed.
pub fn decode_created(data: &Value, requested_name: &str) -> PanelResult<CreatedSequence> {
    let id = first_i64(data, &["sequence_id", "id"])
        .and_then(|id| u64::try_from(id).ok())
        .map(SequenceId::new)
        .ok_or_else(|| PanelError::Decode(String::from("create response carries no sequence id")))?;
    let name = data
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(requested_name)
        .to_string();
    Ok(CreatedSequence { id, name })
}
