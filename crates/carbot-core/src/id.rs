//! Identity types for the carbot panel.
//!
//! Devices and demo sequences are identified by small integers assigned by
//! the backend. Event identity is an opaque dedup key: a server-assigned
//! event id when one exists, otherwise a hash derived from the record's
//! stable fields.

use std::fmt;

/// Reporting device identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceId(pub u32);

impl DeviceId {
    pub const ZERO: DeviceId = DeviceId(0);

    #[inline]
    pub fn new(id: u32) -> Self {
        DeviceId(id)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Demo sequence identity, assigned by the backend on create.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceId(pub u64);

impl SequenceId {
    #[inline]
    pub fn new(id: u64) -> Self {
        SequenceId(id)
    }
}

impl fmt::Debug for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence({})", self.0)
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event deduplication key.
///
/// `Server` carries the backend's event id and is preferred. `Derived` is a
/// hash over the record's stable fields, used when the backend supplied no
/// id, so that re-delivery of the same push event (possible after a
/// reconnect) does not create a duplicate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    Server(u64),
    Derived(u64),
}

impl EventKey {
    /// Fold a value into a derived-key hash.
    #[inline]
    pub fn mix(hash: u64, value: u64) -> u64 {
        (hash ^ value).wrapping_mul(0x517cc1b727220a95)
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Server(id) => write!(f, "Key(srv:{})", id),
            EventKey::Derived(h) => write!(f, "Key(drv:{:016x})", h),
        }
    }
}
