//! Presenter seam.
//!
//! The host UI implements this; the monitor hands it already-reconciled,
//! immutable state. Implementations must not block.

use carbot_core::{Channel, EventRecord};

use crate::LinkState;

/// Notification weight, mapped to toast styling by UI hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

/// Receives reconciled state changes.
pub trait Presenter: Send + Sync {
    /// Push-channel state transition.
    fn link_changed(&self, state: LinkState);

    /// A channel's headline record changed.
    fn latest_changed(&self, channel: Channel, record: &EventRecord);

    /// A channel's bounded history changed; `log` is newest first.
    fn log_changed(&self, channel: Channel, log: &[EventRecord]);

    /// Out-of-band notification (snapshot failures, action outcomes).
    fn notice(&self, severity: Severity, message: &str);
}

/// Presenter that renders to the log. Useful headless and as a default.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn link_changed(&self, state: LinkState) {
        tracing::info!(?state, "link");
    }

    fn latest_changed(&self, channel: Channel, record: &EventRecord) {
        tracing::info!(?channel, code = ?record.code, at = ?record.occurred_at, "latest");
    }

    fn log_changed(&self, channel: Channel, log: &[EventRecord]) {
        tracing::debug!(?channel, rows = log.len(), "log refreshed");
    }

    fn notice(&self, severity: Severity, message: &str) {
        tracing::info!(?severity, message, "notice");
    }
}
