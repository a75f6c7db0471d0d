//! Push-channel lifecycle.
//!
//! The supervisor owns at most one live push stream at a time and keeps it
//! alive for the panel's lifetime: on loss it schedules a reconnect with
//! capped-exponential backoff and retries indefinitely. The only exit is an
//! explicit shutdown. It never touches session buffers; everything it
//! produces flows out as `LinkEvent`s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use carbot_transport::{PushEvent, Transport};

/// Push-channel state, in the order a healthy session walks them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    ReconnectScheduled,
}

/// What the supervisor feeds the monitor.
#[derive(Debug)]
pub enum LinkEvent {
    State(LinkState),
    Push(PushEvent),
}

/// Capped-exponential reconnect delays: `base * 2^attempt`, at most `max`,
/// reset on every successful connect.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Handle to the supervision task.
pub struct ConnectionSupervisor {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ConnectionSupervisor {
    /// Start supervising. Returns the handle and the event stream the
    /// caller must drain; dropping the receiver stops the task.
    pub fn spawn(
        transport: Arc<dyn Transport>,
        backoff: BackoffPolicy,
    ) -> (Self, mpsc::Receiver<LinkEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(supervise(transport, backoff, events_tx, shutdown_rx));
        (
            ConnectionSupervisor {
                shutdown: shutdown_tx,
                task,
            },
            events_rx,
        )
    }

    /// Close the channel, cancel any pending reconnect, and wait for the
    /// task to land in `Idle`.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn supervise(
    transport: Arc<dyn Transport>,
    backoff: BackoffPolicy,
    events: mpsc::Sender<LinkEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt = 0u32;
    loop {
        if *shutdown.borrow() {
            break;
        }
        if events.send(LinkEvent::State(LinkState::Connecting)).await.is_err() {
            return;
        }

        match transport.subscribe().await {
            Ok(mut stream) => {
                attempt = 0;
                info!("push channel connected");
                if events.send(LinkEvent::State(LinkState::Connected)).await.is_err() {
                    stream.close().await;
                    return;
                }
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            stream.close().await;
                            let _ = events.send(LinkEvent::State(LinkState::Idle)).await;
                            return;
                        }
                        event = stream.next_event() => match event {
                            Some(event) => {
                                if events.send(LinkEvent::Push(event)).await.is_err() {
                                    stream.close().await;
                                    return;
                                }
                            }
                            None => break,
                        }
                    }
                }
                // The dead handle is closed and dropped here, before any
                // reconnect attempt: never two live streams.
                stream.close().await;
                drop(stream);
                warn!("push channel lost");
            }
            Err(err) => warn!(%err, "push connect failed"),
        }

        if events.send(LinkEvent::State(LinkState::Disconnected)).await.is_err() {
            return;
        }
        let delay = backoff.delay(attempt);
        attempt = attempt.saturating_add(1);
        if events
            .send(LinkEvent::State(LinkState::ReconnectScheduled))
            .await
            .is_err()
        {
            return;
        }
        debug!(?delay, attempt, "reconnect scheduled");
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = events.send(LinkEvent::State(LinkState::Idle)).await;
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
    let _ = events.send(LinkEvent::State(LinkState::Idle)).await;
}
