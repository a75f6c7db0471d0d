//! Bounded per-channel event history.
//!
//! One buffer backs one monitoring table: the most recent `K` events for a
//! channel, newest first. Inserts deduplicate on the record key and keep
//! timestamp order where timestamps exist; records without one hold their
//! arrival position. Eviction is always from the back (oldest).

use std::collections::VecDeque;

use carbot_core::EventRecord;

/// History depth of the panel's per-channel tables.
pub const DEFAULT_CAPACITY: usize = 10;

/// Outcome of an insert attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { evicted: bool },
    /// A record with the same key is already buffered; idempotent no-op.
    Duplicate,
}

/// Bounded, ordered, deduplicated store for one event channel.
#[derive(Debug)]
pub struct ChannelBuffer {
    records: VecDeque<EventRecord>,
    capacity: usize,
}

impl ChannelBuffer {
    pub fn new(capacity: usize) -> Self {
        ChannelBuffer {
            records: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace contents with snapshot records, given newest-first, truncated
    /// to capacity. Precondition: the buffer has been drained; seeding never
    /// merges with existing contents.
    pub fn seed(&mut self, records: Vec<EventRecord>) {
        self.records = records.into_iter().take(self.capacity).collect();
    }

    /// Take all buffered records, newest first, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        self.records.drain(..).collect()
    }

    /// Insert a record, dropping it if its key is already present and
    /// evicting the oldest entry when over capacity.
    pub fn insert(&mut self, record: EventRecord) -> InsertOutcome {
        let key = record.key();
        if self.records.iter().any(|r| r.key() == key) {
            return InsertOutcome::Duplicate;
        }
        let index = self.insertion_index(&record);
        self.records.insert(index, record);
        let evicted = self.records.len() > self.capacity;
        if evicted {
            self.records.pop_back();
        }
        InsertOutcome::Inserted { evicted }
    }

    /// Position for a new record: before the first entry whose known
    /// timestamp is not greater than the record's. Entries without a
    /// timestamp are never hopped over, and a record without one goes
    /// straight to the front (newest arrival wins).
    fn insertion_index(&self, record: &EventRecord) -> usize {
        let Some(at) = record.occurred_at else {
            return 0;
        };
        let mut index = 0;
        for existing in &self.records {
            match existing.occurred_at {
                Some(t) if t > at => index += 1,
                _ => break,
            }
        }
        index
    }

    /// Current newest-first view. Pure read.
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }
}
