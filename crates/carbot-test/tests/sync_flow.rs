//! Snapshot + push merge behavior through the full monitor stack.

use std::sync::Arc;
use std::time::Duration;

use carbot_core::{Channel, DeviceId, EventRecord, EventTime, PanelError, StaticCatalog};
use carbot_runtime::{BackoffPolicy, Monitor, MonitorConfig, Severity};
use carbot_test::{wait_until, RecordingPresenter, ScriptedTransport};

const DEVICE: DeviceId = DeviceId(1);

fn movement(id: u64, at: i64) -> EventRecord {
    EventRecord::new(Channel::Movement, DEVICE)
        .with_code(1)
        .with_server_id(id)
        .with_occurred_at(EventTime::from_millis(at))
}

fn quick_config() -> MonitorConfig {
    MonitorConfig {
        device: DEVICE,
        snapshot_timeout: Duration::from_secs(1),
        backoff: BackoffPolicy {
            base: Duration::from_millis(10),
            max: Duration::from_millis(50),
        },
        ..MonitorConfig::default()
    }
}

fn spawn_monitor(transport: &ScriptedTransport, presenter: &RecordingPresenter) -> Monitor {
    Monitor::spawn(
        quick_config(),
        Arc::new(transport.clone()),
        Arc::new(StaticCatalog),
        Arc::new(presenter.clone()),
    )
}

fn shown_latest_id(presenter: &RecordingPresenter, channel: Channel) -> Option<u64> {
    presenter.last_latest(channel).and_then(|r| r.server_id)
}

#[tokio::test]
async fn test_snapshot_seeds_view_then_push_updates() {
    let transport = ScriptedTransport::new();
    transport.set_latest(Channel::Movement, DEVICE, movement(3, 3000));
    transport.set_recent(
        Channel::Movement,
        DEVICE,
        vec![movement(3, 3000), movement(2, 2000), movement(1, 1000)],
    );
    let presenter = RecordingPresenter::new();
    let monitor = spawn_monitor(&transport, &presenter);

    wait_until("snapshot presented", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(3)
    })
    .await;
    assert_eq!(presenter.last_log(Channel::Movement).unwrap().len(), 3);

    wait_until("link up", || transport.live_streams() == 1).await;
    assert!(transport.push(Channel::Movement, movement(4, 4000)));
    wait_until("push presented", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(4)
    })
    .await;
    let log = presenter.last_log(Channel::Movement).unwrap();
    assert_eq!(log[0].server_id, Some(4));

    monitor.close().await;
}

#[tokio::test]
async fn test_push_arriving_before_snapshot_resolves_stays_latest() {
    // The snapshot is slow; a newer push lands first. Seeding must not
    // clobber it.
    let transport = ScriptedTransport::new();
    transport.set_read_delay(Duration::from_millis(50));
    transport.set_latest(Channel::Movement, DEVICE, movement(3, 3000));
    transport.set_recent(
        Channel::Movement,
        DEVICE,
        vec![movement(3, 3000), movement(2, 2000), movement(1, 1000)],
    );
    let presenter = RecordingPresenter::new();
    let monitor = spawn_monitor(&transport, &presenter);

    wait_until("link up", || transport.live_streams() == 1).await;
    assert!(transport.push(Channel::Movement, movement(9, 9000)));
    wait_until("push presented first", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(9)
    })
    .await;

    // Snapshot merges in behind it.
    wait_until("snapshot merged", || {
        presenter
            .last_log(Channel::Movement)
            .map(|log| log.len() >= 3)
            .unwrap_or(false)
    })
    .await;
    assert_eq!(shown_latest_id(&presenter, Channel::Movement), Some(9));
    let log = presenter.last_log(Channel::Movement).unwrap();
    assert_eq!(log[0].server_id, Some(9));

    monitor.close().await;
}

#[tokio::test]
async fn test_push_after_snapshot_gives_same_view() {
    // Order-independence counterpart: same records, push lands after the
    // snapshot resolves; the settled view is identical.
    let transport = ScriptedTransport::new();
    transport.set_latest(Channel::Movement, DEVICE, movement(3, 3000));
    transport.set_recent(
        Channel::Movement,
        DEVICE,
        vec![movement(3, 3000), movement(2, 2000), movement(1, 1000)],
    );
    let presenter = RecordingPresenter::new();
    let monitor = spawn_monitor(&transport, &presenter);

    wait_until("snapshot presented", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(3)
    })
    .await;
    wait_until("link up", || transport.live_streams() == 1).await;
    assert!(transport.push(Channel::Movement, movement(9, 9000)));
    wait_until("push presented", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(9)
    })
    .await;
    let log = presenter.last_log(Channel::Movement).unwrap();
    assert_eq!(log[0].server_id, Some(9));

    monitor.close().await;
}

#[tokio::test]
async fn test_snapshot_failure_is_nonfatal() {
    let transport = ScriptedTransport::new();
    transport.fail_reads(true);
    let presenter = RecordingPresenter::new();
    let monitor = spawn_monitor(&transport, &presenter);

    wait_until("failure surfaced", || {
        presenter
            .notices()
            .iter()
            .any(|(severity, message)| {
                *severity == Severity::Warning && message.contains("initial data unavailable")
            })
    })
    .await;

    // The view still works, fed by push alone.
    wait_until("link up", || transport.live_streams() == 1).await;
    assert!(transport.push(Channel::Movement, movement(1, 1000)));
    wait_until("push presented", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(1)
    })
    .await;
    assert_eq!(presenter.last_log(Channel::Movement).unwrap().len(), 1);

    monitor.close().await;
}

#[tokio::test]
async fn test_duplicate_push_not_presented_twice() {
    let transport = ScriptedTransport::new();
    let presenter = RecordingPresenter::new();
    let monitor = spawn_monitor(&transport, &presenter);

    wait_until("link up", || transport.live_streams() == 1).await;
    assert!(transport.push(Channel::Movement, movement(5, 5000)));
    wait_until("first copy shown", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(5)
    })
    .await;

    // Re-deliver the same record, then a fresh one as a fence.
    assert!(transport.push(Channel::Movement, movement(5, 5000)));
    assert!(transport.push(Channel::Movement, movement(6, 6000)));
    wait_until("fence shown", || {
        shown_latest_id(&presenter, Channel::Movement) == Some(6)
    })
    .await;

    let log = presenter.last_log(Channel::Movement).unwrap();
    let ids: Vec<_> = log.iter().map(|r| r.server_id).collect();
    assert_eq!(ids, vec![Some(6), Some(5)]);

    monitor.close().await;
}

#[tokio::test]
async fn test_demo_run_progress_flows_through() {
    let transport = ScriptedTransport::new();
    let presenter = RecordingPresenter::new();
    let monitor = spawn_monitor(&transport, &presenter);

    wait_until("link up", || transport.live_streams() == 1).await;
    let progress = EventRecord::new(Channel::DemoRun, DeviceId::new(12))
        .with_code(8)
        .with_server_id(77);
    assert!(transport.push(Channel::DemoRun, progress));
    wait_until("progress presented", || {
        presenter
            .last_latest(Channel::DemoRun)
            .map(|r| r.code == Some(8))
            .unwrap_or(false)
    })
    .await;

    monitor.close().await;
}

#[tokio::test]
async fn test_manual_actions_validate_before_submitting() {
    let transport = ScriptedTransport::new();
    let presenter = RecordingPresenter::new();
    let monitor = spawn_monitor(&transport, &presenter);

    let err = monitor.send_movement(99).await.unwrap_err();
    assert!(matches!(err, PanelError::Validation(_)));
    assert!(transport.submissions().is_empty());

    let record = monitor.send_movement(3).await.unwrap();
    assert_eq!(record.code, Some(3));
    assert_eq!(transport.submissions().len(), 1);

    monitor.close().await;
}
