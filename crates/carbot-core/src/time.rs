//! Event timestamps.
//!
//! The backend stamps events with a wall-clock time and ships it as a bare
//! datetime string, sometimes `T`-separated and sometimes space-separated.
//! Internally a timestamp is milliseconds since the Unix epoch; records that
//! arrive without one carry `None` and order by arrival instead.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime};

/// Accepted wire shapes, tried in order after RFC 3339.
const WIRE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Wall-clock event time in milliseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventTime(pub i64);

impl EventTime {
    pub const ZERO: EventTime = EventTime(0);

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        EventTime(millis)
    }

    #[inline]
    pub fn from_secs(secs: i64) -> Self {
        EventTime(secs * 1000)
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Current wall-clock time. Times before the epoch clamp to zero.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        EventTime(millis)
    }

    /// Parse a backend timestamp string.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(EventTime(dt.timestamp_millis()));
        }
        for format in WIRE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Some(EventTime(dt.and_utc().timestamp_millis()));
            }
        }
        None
    }

    /// Render in the space-separated form the panel displays.
    pub fn render(self) -> String {
        match DateTime::from_timestamp_millis(self.0) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => String::from("..."),
        }
    }
}

impl fmt::Debug for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventTime({})", self.render())
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
