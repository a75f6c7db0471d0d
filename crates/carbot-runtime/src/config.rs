//! Monitor configuration.

use std::time::Duration;

use carbot_core::{Channel, DeviceId};
use carbot_sync::DEFAULT_CAPACITY;

use crate::BackoffPolicy;

/// Configuration for one monitoring target. The connection target itself
/// (server address) lives in the transport; this only shapes the view.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Device whose events the panel follows.
    pub device: DeviceId,
    /// Channels to track.
    pub channels: Vec<Channel>,
    /// Per-channel history depth.
    pub history_limit: usize,
    /// Bound on the initial snapshot load; a timeout is non-fatal.
    pub snapshot_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            device: DeviceId::new(1),
            channels: Channel::ALL.to_vec(),
            history_limit: DEFAULT_CAPACITY,
            snapshot_timeout: Duration::from_secs(5),
            backoff: BackoffPolicy::default(),
        }
    }
}
