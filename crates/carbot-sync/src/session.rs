//! Per-device sync session.
//!
//! A session brings a device's view from unknown to consistent (one-time
//! snapshot seed) and keeps it consistent as push events arrive. Push events
//! may land before the snapshot resolves; the seed therefore goes through
//! the same recency-comparing "latest" path as pushes and re-inserts any
//! earlier push records on top of the seeded history, so a snapshot can
//! never clobber newer push-delivered state.

use std::collections::HashMap;

use tracing::{debug, warn};

use carbot_core::{Channel, DeviceId, EventRecord, PanelError, PanelResult};

use crate::{ChannelBuffer, InsertOutcome};

/// One channel's slice of the initial snapshot read.
#[derive(Clone, Debug)]
pub struct ChannelSnapshot {
    pub channel: Channel,
    /// Most recent single record, used for the headline display.
    pub latest: Option<EventRecord>,
    /// Most recent history, newest first.
    pub recent: Vec<EventRecord>,
}

/// Where the one-time snapshot load stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotState {
    NotLoaded,
    Loaded,
    /// Load failed or timed out; buffers keep whatever pushes delivered.
    Failed,
}

/// Result of merging one push event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied { latest_changed: bool },
    /// Idempotent re-delivery; view unchanged.
    Duplicate,
    /// Session closed or channel untracked; view unchanged.
    Ignored,
}

/// Merge counters, logged on close.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncStats {
    pub pushes_received: u64,
    pub duplicates_dropped: u64,
    pub records_seeded: u64,
    pub latest_updates: u64,
    pub evictions: u64,
}

/// Owns the per-channel buffers and headline records for one device.
///
/// Single-writer: the owning task is the sole mutator, readers get cloned
/// snapshots.
#[derive(Debug)]
pub struct SyncSession {
    subject: DeviceId,
    buffers: HashMap<Channel, ChannelBuffer>,
    latest: HashMap<Channel, EventRecord>,
    next_arrival: u64,
    snapshot_state: SnapshotState,
    closed: bool,
    stats: SyncStats,
}

impl SyncSession {
    /// Open a session tracking `channels`, each with an empty buffer of the
    /// given capacity.
    pub fn open(subject: DeviceId, channels: &[Channel], capacity: usize) -> Self {
        let buffers = channels
            .iter()
            .map(|&channel| (channel, ChannelBuffer::new(capacity)))
            .collect();
        SyncSession {
            subject,
            buffers,
            latest: HashMap::new(),
            next_arrival: 0,
            snapshot_state: SnapshotState::NotLoaded,
            closed: false,
            stats: SyncStats::default(),
        }
    }

    pub fn subject(&self) -> DeviceId {
        self.subject
    }

    pub fn tracks(&self, channel: Channel) -> bool {
        self.buffers.contains_key(&channel)
    }

    pub fn snapshot_state(&self) -> SnapshotState {
        self.snapshot_state
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stamp a record with the session-local arrival sequence. Every record
    /// enters the session through this, push and snapshot alike, so recency
    /// comparison always has a total tie-break.
    fn admit(&mut self, record: EventRecord) -> EventRecord {
        let seq = self.next_arrival;
        self.next_arrival += 1;
        record.with_arrival(seq)
    }

    fn update_latest(&mut self, record: EventRecord) -> bool {
        match self.latest.get(&record.channel) {
            Some(current) if !record.supersedes(current) => false,
            _ => {
                self.latest.insert(record.channel, record);
                self.stats.latest_updates += 1;
                true
            }
        }
    }

    /// Merge one push-delivered record. Safe to call before the snapshot
    /// resolves; whatever lands here first participates in the eventual
    /// seed-vs-push reconciliation.
    pub fn apply_push(&mut self, record: EventRecord) -> MergeOutcome {
        if self.closed {
            debug!(channel = ?record.channel, "push after close, dropping");
            return MergeOutcome::Ignored;
        }
        if !self.tracks(record.channel) {
            return MergeOutcome::Ignored;
        }
        self.stats.pushes_received += 1;
        let record = self.admit(record);
        let channel = record.channel;
        let Some(buffer) = self.buffers.get_mut(&channel) else {
            return MergeOutcome::Ignored;
        };
        match buffer.insert(record.clone()) {
            InsertOutcome::Duplicate => {
                self.stats.duplicates_dropped += 1;
                debug!(?channel, key = ?record.key(), "duplicate push dropped");
                MergeOutcome::Duplicate
            }
            InsertOutcome::Inserted { evicted } => {
                if evicted {
                    self.stats.evictions += 1;
                }
                let latest_changed = self.update_latest(record);
                MergeOutcome::Applied { latest_changed }
            }
        }
    }

    /// Seed buffers and headline records from the one-time snapshot read.
    ///
    /// Runs exactly once per session lifetime; a second call is a caller
    /// error. Returns the tracked channels that were refreshed. The
    /// headline assignment goes through the same recency compare as
    /// `apply_push`, never an unconditional overwrite.
    pub fn apply_snapshot(&mut self, parts: Vec<ChannelSnapshot>) -> PanelResult<Vec<Channel>> {
        if self.closed {
            return Err(PanelError::Closed);
        }
        if self.snapshot_state != SnapshotState::NotLoaded {
            return Err(PanelError::Validation(String::from(
                "snapshot already applied to this session",
            )));
        }

        let mut refreshed = Vec::new();
        for part in parts {
            if !self.tracks(part.channel) {
                warn!(channel = ?part.channel, "snapshot for untracked channel, skipping");
                continue;
            }

            // Admit oldest-first so arrival order matches event order within
            // the snapshot, then restore the newest-first shape for seeding.
            let mut admitted: Vec<EventRecord> =
                part.recent.into_iter().rev().map(|r| self.admit(r)).collect();
            admitted.reverse();
            self.stats.records_seeded += admitted.len() as u64;

            let Some(buffer) = self.buffers.get_mut(&part.channel) else {
                continue;
            };
            // Pushes that raced the snapshot go back in on top of the seed;
            // buffer dedup drops the ones the snapshot already covers.
            let raced = buffer.drain();
            buffer.seed(admitted);
            for record in raced {
                buffer.insert(record);
            }

            if let Some(latest) = part.latest {
                let latest = self.admit(latest);
                self.update_latest(latest);
            }
            refreshed.push(part.channel);
        }

        self.snapshot_state = SnapshotState::Loaded;
        debug!(subject = %self.subject, seeded = self.stats.records_seeded, "snapshot applied");
        Ok(refreshed)
    }

    /// Record that the snapshot read failed or timed out. Non-fatal: the
    /// view stays as-is (usually empty) and keeps merging pushes.
    pub fn mark_snapshot_failed(&mut self) {
        if self.snapshot_state == SnapshotState::NotLoaded {
            self.snapshot_state = SnapshotState::Failed;
        }
    }

    /// Headline record for a channel. Monotonically non-decreasing in
    /// effective recency, even as the bounded history drops older entries.
    pub fn current_latest(&self, channel: Channel) -> Option<&EventRecord> {
        self.latest.get(&channel)
    }

    /// Bounded newest-first history for a channel. Pure read.
    pub fn current_log(&self, channel: Channel) -> Vec<EventRecord> {
        self.buffers
            .get(&channel)
            .map(ChannelBuffer::snapshot)
            .unwrap_or_default()
    }

    /// Stop merging: later pushes and snapshot completions become no-ops.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(subject = %self.subject, stats = ?self.stats, "session closed");
        }
    }
}
