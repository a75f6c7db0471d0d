//! Monitor composition.
//!
//! One task owns the device's `SyncSession` and is its sole mutator: it
//! drains supervisor events and completes the one-time snapshot load inside
//! the same `select!` loop, so snapshot and push merging interleave without
//! locks. The presenter receives reconciled state only.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::OptionFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use carbot_core::{Catalog, Channel, DeviceId, EventRecord, PanelError, PanelResult};
use carbot_sync::{ChannelSnapshot, MergeOutcome, SyncSession};
use carbot_transport::{
    EventSubmission, MovementCommand, ObstacleReport, PushEvent, Transport,
};

use crate::{
    ConnectionSupervisor, LinkEvent, MonitorConfig, Presenter, Severity,
};

/// A running monitor for one device.
pub struct Monitor {
    transport: Arc<dyn Transport>,
    catalog: Arc<dyn Catalog>,
    device: DeviceId,
    close: watch::Sender<bool>,
    task: JoinHandle<()>,
    supervisor: ConnectionSupervisor,
}

impl Monitor {
    /// Start monitoring: connects the push channel, kicks off the snapshot
    /// load, and begins routing state changes to the presenter.
    pub fn spawn(
        config: MonitorConfig,
        transport: Arc<dyn Transport>,
        catalog: Arc<dyn Catalog>,
        presenter: Arc<dyn Presenter>,
    ) -> Monitor {
        let (supervisor, link_rx) = ConnectionSupervisor::spawn(transport.clone(), config.backoff);
        let (close_tx, close_rx) = watch::channel(false);
        let session = SyncSession::open(config.device, &config.channels, config.history_limit);
        let device = config.device;
        let task = tokio::spawn(run(
            config,
            transport.clone(),
            presenter,
            session,
            link_rx,
            close_rx,
        ));
        Monitor {
            transport,
            catalog,
            device,
            close: close_tx,
            task,
            supervisor,
        }
    }

    /// Submit a manual movement command for the monitored device.
    pub async fn send_movement(&self, code: i64) -> PanelResult<EventRecord> {
        if !self.catalog.contains(Channel::Movement, code) {
            return Err(PanelError::Validation(format!("unknown movement code {code}")));
        }
        self.transport
            .submit_event(EventSubmission::Movement(MovementCommand {
                device: self.device,
                code,
                sequence: None,
            }))
            .await
    }

    /// Report an obstacle for the monitored device.
    pub async fn report_obstacle(&self, report: ObstacleReport) -> PanelResult<EventRecord> {
        if !self.catalog.contains(Channel::Obstacle, report.code) {
            return Err(PanelError::Validation(format!(
                "unknown obstacle code {}",
                report.code
            )));
        }
        self.transport
            .submit_event(EventSubmission::Obstacle(report))
            .await
    }

    /// Stop routing, close the session, and tear the push channel down.
    pub async fn close(self) {
        let _ = self.close.send(true);
        let _ = self.task.await;
        self.supervisor.shutdown().await;
    }
}

async fn run(
    config: MonitorConfig,
    transport: Arc<dyn Transport>,
    presenter: Arc<dyn Presenter>,
    mut session: SyncSession,
    mut link_rx: mpsc::Receiver<LinkEvent>,
    mut close_rx: watch::Receiver<bool>,
) {
    let fetch = fetch_snapshot(
        transport,
        config.device,
        config.channels.clone(),
        config.history_limit,
        config.snapshot_timeout,
    );
    let mut snapshot: OptionFuture<_> = Some(Box::pin(fetch)).into();

    loop {
        tokio::select! {
            _ = close_rx.changed() => break,
            Some(result) = &mut snapshot => {
                snapshot = None.into();
                finish_snapshot(&mut session, presenter.as_ref(), result);
            }
            event = link_rx.recv() => match event {
                Some(LinkEvent::State(state)) => presenter.link_changed(state),
                Some(LinkEvent::Push(push)) => route_push(&mut session, presenter.as_ref(), push),
                None => break,
            }
        }
    }
    // An in-flight snapshot resolving after this point hits a closed
    // session and is discarded.
    session.close();
}

fn route_push(session: &mut SyncSession, presenter: &dyn Presenter, push: PushEvent) {
    let channel = push.channel;
    match session.apply_push(push.record) {
        MergeOutcome::Applied { latest_changed } => {
            if latest_changed {
                if let Some(latest) = session.current_latest(channel) {
                    presenter.latest_changed(channel, latest);
                }
            }
            presenter.log_changed(channel, &session.current_log(channel));
        }
        MergeOutcome::Duplicate | MergeOutcome::Ignored => {}
    }
}

fn finish_snapshot(
    session: &mut SyncSession,
    presenter: &dyn Presenter,
    result: PanelResult<Vec<ChannelSnapshot>>,
) {
    match result {
        Ok(parts) => match session.apply_snapshot(parts) {
            Ok(refreshed) => {
                for channel in refreshed {
                    if let Some(latest) = session.current_latest(channel) {
                        presenter.latest_changed(channel, latest);
                    }
                    presenter.log_changed(channel, &session.current_log(channel));
                }
            }
            Err(err) => debug!(%err, "snapshot discarded"),
        },
        Err(err) => {
            warn!(%err, "initial snapshot unavailable");
            session.mark_snapshot_failed();
            presenter.notice(
                Severity::Warning,
                &format!("initial data unavailable: {err}"),
            );
        }
    }
}

/// One bounded read per channel: the headline record plus recent history.
async fn fetch_snapshot(
    transport: Arc<dyn Transport>,
    device: DeviceId,
    channels: Vec<Channel>,
    limit: usize,
    timeout: Duration,
) -> PanelResult<Vec<ChannelSnapshot>> {
    let fetch = async {
        let mut parts = Vec::with_capacity(channels.len());
        for channel in channels {
            let latest = transport.read_latest(channel, device).await?;
            let recent = transport.read_recent(channel, device, limit).await?;
            parts.push(ChannelSnapshot {
                channel,
                latest,
                recent,
            });
        }
        Ok(parts)
    };
    match tokio::time::timeout(timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(PanelError::Timeout(String::from("initial snapshot"))),
    }
}
