//! Scripted in-memory transport.
//!
//! Backs integration tests without a backend: reads serve fixtures (with an
//! optional delay, for racing pushes against a snapshot in flight), create
//! results pop off a script, and the push link is a channel the test feeds
//! and severs at will. Live stream handles are counted so tests can assert
//! the never-two-live-channels contract.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use carbot_core::{
    Channel, CreatedSequence, DeviceId, EventRecord, PanelError, PanelResult, RunReceipt,
    SequenceId, SequenceSummary,
};
use carbot_transport::{
    CreateSequenceRequest, EventSubmission, PushEvent, PushStream, RunSequenceRequest, Transport,
};

#[derive(Default)]
struct ScriptState {
    latest: Mutex<HashMap<(Channel, DeviceId), EventRecord>>,
    recent: Mutex<HashMap<(Channel, DeviceId), Vec<EventRecord>>>,
    sequences: Mutex<Vec<SequenceSummary>>,
    create_script: Mutex<VecDeque<PanelResult<CreatedSequence>>>,
    create_names: Mutex<Vec<String>>,
    created_counter: AtomicUsize,
    run_requests: Mutex<Vec<RunSequenceRequest>>,
    run_accepted: AtomicBool,
    submissions: Mutex<Vec<EventSubmission>>,
    fail_reads: AtomicBool,
    read_delay: Mutex<Duration>,
    fail_connects: AtomicUsize,
    connects: AtomicUsize,
    live_streams: AtomicUsize,
    max_live_streams: AtomicUsize,
    push_tx: Mutex<Option<mpsc::UnboundedSender<PushEvent>>>,
}

/// In-memory `Transport` driven by the test.
#[derive(Clone)]
pub struct ScriptedTransport {
    state: Arc<ScriptState>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        ScriptedTransport::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let state = ScriptState::default();
        state.run_accepted.store(true, Ordering::SeqCst);
        ScriptedTransport {
            state: Arc::new(state),
        }
    }

    // ----- fixtures -----

    pub fn set_latest(&self, channel: Channel, device: DeviceId, record: EventRecord) {
        self.state.latest.lock().insert((channel, device), record);
    }

    pub fn set_recent(&self, channel: Channel, device: DeviceId, records: Vec<EventRecord>) {
        self.state.recent.lock().insert((channel, device), records);
    }

    pub fn set_sequences(&self, list: Vec<SequenceSummary>) {
        *self.state.sequences.lock() = list;
    }

    /// Queue the outcome of the next `create_sequence` call. With an empty
    /// script, creates succeed with a fresh id and the requested name.
    pub fn script_create(&self, result: PanelResult<CreatedSequence>) {
        self.state.create_script.lock().push_back(result);
    }

    pub fn set_run_accepted(&self, accepted: bool) {
        self.state.run_accepted.store(accepted, Ordering::SeqCst);
    }

    // ----- fault injection -----

    pub fn fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Delay every read; lets a test land pushes while a snapshot is in
    /// flight.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.state.read_delay.lock() = delay;
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.state.fail_connects.store(count, Ordering::SeqCst);
    }

    // ----- push link control -----

    /// Deliver a push event over the live link; false when none is up.
    pub fn push(&self, channel: Channel, record: EventRecord) -> bool {
        let guard = self.state.push_tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.send(PushEvent { channel, record }).is_ok(),
            None => false,
        }
    }

    /// Sever the live link, as a network drop would.
    pub fn drop_link(&self) {
        self.state.push_tx.lock().take();
    }

    // ----- observations -----

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn live_streams(&self) -> usize {
        self.state.live_streams.load(Ordering::SeqCst)
    }

    /// Most simultaneously-live stream handles ever observed.
    pub fn max_live_streams(&self) -> usize {
        self.state.max_live_streams.load(Ordering::SeqCst)
    }

    pub fn created_names(&self) -> Vec<String> {
        self.state.create_names.lock().clone()
    }

    pub fn run_requests(&self) -> Vec<RunSequenceRequest> {
        self.state.run_requests.lock().clone()
    }

    pub fn submissions(&self) -> Vec<EventSubmission> {
        self.state.submissions.lock().clone()
    }

    async fn simulate_read(&self) -> PanelResult<()> {
        let delay = *self.state.read_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(PanelError::Transport(String::from("scripted read failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn read_latest(
        &self,
        channel: Channel,
        device: DeviceId,
    ) -> PanelResult<Option<EventRecord>> {
        self.simulate_read().await?;
        Ok(self.state.latest.lock().get(&(channel, device)).cloned())
    }

    async fn read_recent(
        &self,
        channel: Channel,
        device: DeviceId,
        limit: usize,
    ) -> PanelResult<Vec<EventRecord>> {
        self.simulate_read().await?;
        let mut records = self
            .state
            .recent
            .lock()
            .get(&(channel, device))
            .cloned()
            .unwrap_or_default();
        records.truncate(limit);
        Ok(records)
    }

    async fn submit_event(&self, submission: EventSubmission) -> PanelResult<EventRecord> {
        let (channel, device, code) = match &submission {
            EventSubmission::Movement(cmd) => (Channel::Movement, cmd.device, cmd.code),
            EventSubmission::Obstacle(report) => (Channel::Obstacle, report.device, report.code),
        };
        let mut submissions = self.state.submissions.lock();
        submissions.push(submission);
        let id = 1000 + submissions.len() as u64;
        Ok(EventRecord::new(channel, device)
            .with_code(code)
            .with_server_id(id))
    }

    async fn create_sequence(
        &self,
        request: CreateSequenceRequest,
    ) -> PanelResult<CreatedSequence> {
        self.state.create_names.lock().push(request.name.clone());
        if let Some(result) = self.state.create_script.lock().pop_front() {
            return result;
        }
        let id = self.state.created_counter.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        Ok(CreatedSequence {
            id: SequenceId::new(id),
            name: request.name,
        })
    }

    async fn list_sequences(&self, limit: usize) -> PanelResult<Vec<SequenceSummary>> {
        let mut list = self.state.sequences.lock().clone();
        list.truncate(limit);
        Ok(list)
    }

    async fn run_sequence(&self, request: RunSequenceRequest) -> PanelResult<RunReceipt> {
        self.state.run_requests.lock().push(request);
        Ok(RunReceipt {
            accepted: self.state.run_accepted.load(Ordering::SeqCst),
        })
    }

    async fn subscribe(&self) -> PanelResult<Box<dyn PushStream>> {
        let remaining = self.state.fail_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.fail_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(PanelError::Transport(String::from("scripted connect failure")));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.push_tx.lock() = Some(tx);
        self.state.connects.fetch_add(1, Ordering::SeqCst);

        let live = self.state.live_streams.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live_streams.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(ScriptedPushStream {
            rx,
            closed: false,
            state: self.state.clone(),
        }))
    }
}

struct ScriptedPushStream {
    rx: mpsc::UnboundedReceiver<PushEvent>,
    closed: bool,
    state: Arc<ScriptState>,
}

#[async_trait]
impl PushStream for ScriptedPushStream {
    async fn next_event(&mut self) -> Option<PushEvent> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

impl Drop for ScriptedPushStream {
    fn drop(&mut self) {
        self.state.live_streams.fetch_sub(1, Ordering::SeqCst);
    }
}
