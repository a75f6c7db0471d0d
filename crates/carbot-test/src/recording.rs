//! Recording presenter.

use std::sync::Arc;

use parking_lot::Mutex;

use carbot_core::{Channel, EventRecord};
use carbot_runtime::{LinkState, Presenter, Severity};

#[derive(Default)]
struct Recorded {
    states: Mutex<Vec<LinkState>>,
    latest: Mutex<Vec<(Channel, EventRecord)>>,
    logs: Mutex<Vec<(Channel, Vec<EventRecord>)>>,
    notices: Mutex<Vec<(Severity, String)>>,
}

/// Captures every presenter callback for later assertion.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    recorded: Arc<Recorded>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        RecordingPresenter::default()
    }

    pub fn states(&self) -> Vec<LinkState> {
        self.recorded.states.lock().clone()
    }

    /// Most recent headline shown for a channel.
    pub fn last_latest(&self, channel: Channel) -> Option<EventRecord> {
        self.recorded
            .latest
            .lock()
            .iter()
            .rev()
            .find(|(c, _)| *c == channel)
            .map(|(_, r)| r.clone())
    }

    /// Most recent history table shown for a channel.
    pub fn last_log(&self, channel: Channel) -> Option<Vec<EventRecord>> {
        self.recorded
            .logs
            .lock()
            .iter()
            .rev()
            .find(|(c, _)| *c == channel)
            .map(|(_, rows)| rows.clone())
    }

    pub fn notices(&self) -> Vec<(Severity, String)> {
        self.recorded.notices.lock().clone()
    }

    pub fn latest_count(&self, channel: Channel) -> usize {
        self.recorded
            .latest
            .lock()
            .iter()
            .filter(|(c, _)| *c == channel)
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn link_changed(&self, state: LinkState) {
        self.recorded.states.lock().push(state);
    }

    fn latest_changed(&self, channel: Channel, record: &EventRecord) {
        self.recorded.latest.lock().push((channel, record.clone()));
    }

    fn log_changed(&self, channel: Channel, log: &[EventRecord]) {
        self.recorded.logs.lock().push((channel, log.to_vec()));
    }

    fn notice(&self, severity: Severity, message: &str) {
        self.recorded
            .notices
            .lock()
            .push((severity, message.to_string()));
    }
}
