//! Sequencer flows against the scripted backend: conflict retry, run
//! gating, listing refresh.

use std::sync::Arc;

use carbot_core::{DeviceId, PanelError, SequenceId, SequenceSummary, StaticCatalog};
use carbot_sequence::DemoSequencer;
use carbot_test::ScriptedTransport;

const OWNER: DeviceId = DeviceId(1);

fn sequencer_with_steps() -> DemoSequencer {
    let mut sequencer = DemoSequencer::new(Arc::new(StaticCatalog));
    sequencer.add_step(1, 800).unwrap();
    sequencer.add_step(3, 300).unwrap();
    sequencer
}

#[tokio::test]
async fn test_create_requires_steps() {
    let transport = ScriptedTransport::new();
    let mut sequencer = DemoSequencer::new(Arc::new(StaticCatalog));
    let err = sequencer.create(&transport, "X", OWNER).await.unwrap_err();
    assert!(matches!(err, PanelError::Validation(_)));
    assert!(transport.created_names().is_empty());
}

#[tokio::test]
async fn test_create_synthesizes_empty_name() {
    let transport = ScriptedTransport::new();
    let mut sequencer = sequencer_with_steps();
    let created = sequencer.create(&transport, "   ", OWNER).await.unwrap();
    assert!(created.name.starts_with("DEMO_"), "name: {}", created.name);
    assert_eq!(transport.created_names().len(), 1);
}

#[tokio::test]
async fn test_create_conflict_retries_once_with_suffix() {
    let transport = ScriptedTransport::new();
    transport.script_create(Err(PanelError::Conflict(String::from("HTTP 409"))));
    let mut sequencer = sequencer_with_steps();

    let created = sequencer.create(&transport, "LAPS", OWNER).await.unwrap();

    let names = transport.created_names();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], "LAPS");
    assert!(names[1].starts_with("LAPS_"), "retry name: {}", names[1]);
    // The caller learns the stored name differs from what it asked for.
    assert_eq!(created.name, names[1]);
    assert_ne!(created.name, "LAPS");
}

#[tokio::test]
async fn test_create_failure_after_retry_is_terminal() {
    let transport = ScriptedTransport::new();
    transport.script_create(Err(PanelError::Conflict(String::from("HTTP 409"))));
    transport.script_create(Err(PanelError::Conflict(String::from("HTTP 409"))));
    let mut sequencer = sequencer_with_steps();

    let err = sequencer.create(&transport, "LAPS", OWNER).await.unwrap_err();
    assert!(matches!(err, PanelError::CreateFailed(_)));
    // Exactly one retry, no loop.
    assert_eq!(transport.created_names().len(), 2);
}

#[tokio::test]
async fn test_plain_transport_error_is_not_retried() {
    let transport = ScriptedTransport::new();
    transport.script_create(Err(PanelError::Transport(String::from("connection reset"))));
    let mut sequencer = sequencer_with_steps();

    let err = sequencer.create(&transport, "LAPS", OWNER).await.unwrap_err();
    assert!(matches!(err, PanelError::Transport(_)));
    assert_eq!(transport.created_names().len(), 1);
}

#[tokio::test]
async fn test_run_requires_selection() {
    let transport = ScriptedTransport::new();
    let sequencer = DemoSequencer::new(Arc::new(StaticCatalog));
    let err = sequencer.run(&transport, DeviceId::new(2), 0).await.unwrap_err();
    assert!(matches!(err, PanelError::Validation(_)));
    assert!(transport.run_requests().is_empty());
}

#[tokio::test]
async fn test_run_selected_sequence() {
    let transport = ScriptedTransport::new();
    transport.set_sequences(vec![SequenceSummary {
        id: SequenceId::new(4),
        name: String::from("LAPS"),
        steps_count: Some(5),
    }]);

    let mut sequencer = DemoSequencer::new(Arc::new(StaticCatalog));
    sequencer.refresh(&transport).await.unwrap();
    sequencer.select(SequenceId::new(4));

    let receipt = sequencer.run(&transport, DeviceId::new(2), 250).await.unwrap();
    assert!(receipt.accepted);

    let requests = transport.run_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].sequence, SequenceId::new(4));
    assert_eq!(requests[0].device, DeviceId::new(2));
    assert_eq!(requests[0].start_delay_ms, 250);
}

#[tokio::test]
async fn test_run_declined_by_backend() {
    let transport = ScriptedTransport::new();
    transport.set_run_accepted(false);
    let mut sequencer = DemoSequencer::new(Arc::new(StaticCatalog));
    sequencer.select(SequenceId::new(4));

    let err = sequencer.run(&transport, DeviceId::new(2), 0).await.unwrap_err();
    assert!(matches!(err, PanelError::RunFailed(_)));
}

#[tokio::test]
async fn test_refresh_clears_vanished_selection() {
    let transport = ScriptedTransport::new();
    transport.set_sequences(vec![SequenceSummary {
        id: SequenceId::new(4),
        name: String::from("LAPS"),
        steps_count: None,
    }]);

    let mut sequencer = DemoSequencer::new(Arc::new(StaticCatalog));
    sequencer.select(SequenceId::new(9));
    sequencer.refresh(&transport).await.unwrap();
    assert_eq!(sequencer.selected(), None);

    let err = sequencer.run(&transport, DeviceId::new(2), 0).await.unwrap_err();
    assert!(matches!(err, PanelError::Validation(_)));
}
