//! Carbot Transport - Backend access
//!
//! This crate provides:
//! - The `Transport` trait the sync core and sequencer are written against
//! - The `PushStream` trait for the live event socket
//! - A reqwest-based REST client and a tokio-tungstenite push stream

pub mod push;
pub mod rest;
pub mod wire;

pub use push::*;
pub use rest::*;

use async_trait::async_trait;

use carbot_core::{
    Channel, CreatedSequence, DemoStep, DeviceId, EventRecord, PanelResult, RunReceipt, SequenceId,
    SequenceSummary,
};

/// A manual movement command, as issued from the control page.
#[derive(Clone, Debug)]
pub struct MovementCommand {
    pub device: DeviceId,
    pub code: i64,
    /// Set when the movement belongs to a running demo sequence.
    pub sequence: Option<SequenceId>,
}

/// An obstacle report with sensor context.
#[derive(Clone, Debug)]
pub struct ObstacleReport {
    pub device: DeviceId,
    pub code: i64,
    pub distance_cm: f64,
    /// Whether the firmware should auto-react by backing off.
    pub auto_react: bool,
    pub back_ms: u32,
}

/// Payload for `Transport::submit_event`.
#[derive(Clone, Debug)]
pub enum EventSubmission {
    Movement(MovementCommand),
    Obstacle(ObstacleReport),
}

impl EventSubmission {
    pub fn channel(&self) -> Channel {
        match self {
            EventSubmission::Movement(_) => Channel::Movement,
            EventSubmission::Obstacle(_) => Channel::Obstacle,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CreateSequenceRequest {
    pub name: String,
    pub owner: DeviceId,
    pub steps: Vec<DemoStep>,
}

#[derive(Clone, Copy, Debug)]
pub struct RunSequenceRequest {
    pub sequence: SequenceId,
    pub device: DeviceId,
    pub start_delay_ms: u32,
}

/// One live event delivered over the push channel.
#[derive(Clone, Debug)]
pub struct PushEvent {
    pub channel: Channel,
    pub record: EventRecord,
}

/// Backend access, REST half plus push subscription.
///
/// All operations are request/response against an authority that already
/// created and timestamped the events; this side only reads, submits, and
/// subscribes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Most recent single record for a channel, or None when the backend has
    /// no history for the device.
    async fn read_latest(&self, channel: Channel, device: DeviceId)
        -> PanelResult<Option<EventRecord>>;

    /// Most recent records for a channel, newest first, at most `limit`.
    async fn read_recent(
        &self,
        channel: Channel,
        device: DeviceId,
        limit: usize,
    ) -> PanelResult<Vec<EventRecord>>;

    /// Submit a manually-triggered event; returns the stored record.
    async fn submit_event(&self, submission: EventSubmission) -> PanelResult<EventRecord>;

    /// Create a named demo sequence. Fails with `Conflict` on a duplicate
    /// name.
    async fn create_sequence(&self, request: CreateSequenceRequest)
        -> PanelResult<CreatedSequence>;

    /// Recently created sequences, newest first, at most `limit`.
    async fn list_sequences(&self, limit: usize) -> PanelResult<Vec<SequenceSummary>>;

    /// Trigger execution of a sequence on a device.
    async fn run_sequence(&self, request: RunSequenceRequest) -> PanelResult<RunReceipt>;

    /// Open the live push channel. One call, one stream; the caller owns its
    /// lifecycle.
    async fn subscribe(&self) -> PanelResult<Box<dyn PushStream>>;
}

/// The live event socket: a sequence of push events ending at disconnect.
#[async_trait]
pub trait PushStream: Send {
    /// Next push event; `None` once the link is lost or closed.
    async fn next_event(&mut self) -> Option<PushEvent>;

    /// Graceful close. After this, `next_event` returns `None`.
    async fn close(&mut self);
}
