//! Event channels and records.
//!
//! An `EventRecord` is the immutable unit flowing through the panel: one
//! discrete movement, obstacle, or demo-run progress report, created and
//! timestamped by the backend. The panel only orders and displays them.

use crate::{DeviceId, EventKey, EventTime};

/// Event stream category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Movement,
    Obstacle,
    DemoRun,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Movement, Channel::Obstacle, Channel::DemoRun];

    /// REST route segment for this channel.
    pub fn wire_name(self) -> &'static str {
        match self {
            Channel::Movement => "movement",
            Channel::Obstacle => "obstacle",
            Channel::DemoRun => "demo",
        }
    }

    /// Push frame event name for this channel.
    pub fn push_event_name(self) -> &'static str {
        match self {
            Channel::Movement => "movement:new",
            Channel::Obstacle => "obstacle:new",
            Channel::DemoRun => "demo:run",
        }
    }

    pub fn from_push_event_name(name: &str) -> Option<Self> {
        match name {
            "movement:new" => Some(Channel::Movement),
            "obstacle:new" => Some(Channel::Obstacle),
            "demo:run" => Some(Channel::DemoRun),
            _ => None,
        }
    }

    /// Discriminant folded into derived dedup keys.
    pub(crate) fn tag(self) -> u64 {
        match self {
            Channel::Movement => 1,
            Channel::Obstacle => 2,
            Channel::DemoRun => 3,
        }
    }
}

/// One backend-reported event.
///
/// `code` indexes the relevant catalog; records that arrive without one are
/// kept and render as unknown downstream. `occurred_at` is source-supplied
/// and may be absent, in which case ordering falls back to arrival order.
/// `arrival_seq` is assigned once, when the record enters a session.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub channel: Channel,
    pub subject: DeviceId,
    pub code: Option<i64>,
    pub occurred_at: Option<EventTime>,
    pub distance_cm: Option<f64>,
    pub server_id: Option<u64>,
    pub arrival_seq: u64,
}

impl EventRecord {
    pub fn new(channel: Channel, subject: DeviceId) -> Self {
        EventRecord {
            channel,
            subject,
            code: None,
            occurred_at: None,
            distance_cm: None,
            server_id: None,
            arrival_seq: 0,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_occurred_at(mut self, at: EventTime) -> Self {
        self.occurred_at = Some(at);
        self
    }

    pub fn with_distance(mut self, cm: f64) -> Self {
        self.distance_cm = Some(cm);
        self
    }

    pub fn with_server_id(mut self, id: u64) -> Self {
        self.server_id = Some(id);
        self
    }

    pub fn with_arrival(mut self, seq: u64) -> Self {
        self.arrival_seq = seq;
        self
    }

    /// Deduplication key.
    ///
    /// Prefers the server-assigned id. Without one, the key is derived from
    /// the record's stable fields when it carries a timestamp, so that
    /// re-delivery after a reconnect dedups; a record with neither id nor
    /// timestamp folds in the arrival sequence instead, so distinct arrivals
    /// never collapse.
    pub fn key(&self) -> EventKey {
        if let Some(id) = self.server_id {
            return EventKey::Server(id);
        }
        let mut h = EventKey::mix(0, self.channel.tag());
        h = EventKey::mix(h, self.subject.0 as u64);
        h = EventKey::mix(h, self.code.unwrap_or(-1) as u64);
        match self.occurred_at {
            Some(at) => h = EventKey::mix(h, at.as_millis() as u64),
            None => {
                h = EventKey::mix(h, u64::MAX);
                h = EventKey::mix(h, self.arrival_seq);
            }
        }
        EventKey::Derived(h)
    }

    /// Effective-recency comparison against a currently displayed record.
    ///
    /// Timestamps compare when both are known; otherwise the later arrival
    /// wins, which makes a fresh push supersede anything without a
    /// timestamp. Best-effort for untimed records, not a hard ordering
    /// guarantee.
    pub fn supersedes(&self, current: &EventRecord) -> bool {
        match (self.occurred_at, current.occurred_at) {
            (Some(a), Some(b)) if a != b => a > b,
            _ => self.arrival_seq >= current.arrival_seq,
        }
    }
}
