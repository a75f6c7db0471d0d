//! Demo sequence data.

use serde::Serialize;

use crate::SequenceId;

/// Shortest step the firmware executes reliably.
pub const MIN_STEP_DURATION_MS: u32 = 100;

/// One timed movement in a demo sequence.
///
/// Serializes in the backend's step shape (`status_clave`/`duration_ms`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DemoStep {
    #[serde(rename = "status_clave")]
    pub code: i64,
    pub duration_ms: u32,
}

impl DemoStep {
    pub fn new(code: i64, duration_ms: u32) -> Self {
        DemoStep { code, duration_ms }
    }
}

/// A sequence as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceSummary {
    pub id: SequenceId,
    pub name: String,
    pub steps_count: Option<u32>,
}

/// Result of creating a sequence; `name` is the name actually stored, which
/// differs from the requested one after a conflict retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedSequence {
    pub id: SequenceId,
    pub name: String,
}

/// Backend acknowledgement of a run request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReceipt {
    pub accepted: bool,
}
