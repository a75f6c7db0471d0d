//! REST client against the carbot backend.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use carbot_core::{
    Channel, CreatedSequence, DeviceId, EventRecord, PanelError, PanelResult, RunReceipt,
    SequenceSummary,
};

use crate::wire::{
    data_of, decode_created, decode_record, decode_record_list, decode_sequence_list,
};
use crate::{
    push_url, CreateSequenceRequest, EventSubmission, PushStream, RunSequenceRequest, Transport,
    WsPushStream,
};

/// How many rows the backend's history routes return.
const HISTORY_ROUTE_DEPTH: usize = 10;
const LISTING_ROUTE_DEPTH: usize = 20;

/// reqwest-backed `Transport` implementation.
#[derive(Clone, Debug)]
pub struct RestClient {
    http: reqwest::Client,
    base: String,
}

impl RestClient {
    /// `base_url` is the resolved connection target, e.g.
    /// `http://192.168.1.50:5500`.
    pub fn new(base_url: impl Into<String>) -> Self {
        RestClient {
            http: reqwest::Client::new(),
            base: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_data(&self, path: &str) -> PanelResult<Value> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PanelError::Transport(e.to_string()))?;
        Self::check_status(path, response.status(), false)?;
        let envelope: Value = response
            .json()
            .await
            .map_err(|e| PanelError::Decode(e.to_string()))?;
        data_of(envelope)
    }

    async fn post_data(&self, path: &str, body: &Value, conflict_aware: bool) -> PanelResult<Value> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PanelError::Transport(e.to_string()))?;
        Self::check_status(path, response.status(), conflict_aware)?;
        let envelope: Value = response
            .json()
            .await
            .map_err(|e| PanelError::Decode(e.to_string()))?;
        data_of(envelope)
    }

    /// Map an HTTP status. 409 is always a conflict; the backend also
    /// reports duplicate sequence names as 500, so the create route opts in
    /// to treating that as a conflict too.
    fn check_status(path: &str, status: StatusCode, conflict_aware: bool) -> PanelResult<()> {
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::CONFLICT
            || (conflict_aware && status == StatusCode::INTERNAL_SERVER_ERROR)
        {
            return Err(PanelError::Conflict(format!("HTTP {} on {}", status.as_u16(), path)));
        }
        Err(PanelError::Transport(format!("HTTP {} on {}", status.as_u16(), path)))
    }
}

#[async_trait]
impl Transport for RestClient {
    async fn read_latest(
        &self,
        channel: Channel,
        device: DeviceId,
    ) -> PanelResult<Option<EventRecord>> {
        // Demo runs have no headline route; progress arrives by push only.
        if channel == Channel::DemoRun {
            return Ok(None);
        }
        let path = format!("/api/{}/last/{}", channel.wire_name(), device);
        let data = self.get_data(&path).await?;
        Ok(decode_record(channel, &data))
    }

    async fn read_recent(
        &self,
        channel: Channel,
        device: DeviceId,
        limit: usize,
    ) -> PanelResult<Vec<EventRecord>> {
        if channel == Channel::DemoRun {
            return Ok(Vec::new());
        }
        let path = format!(
            "/api/{}/last{}/{}",
            channel.wire_name(),
            HISTORY_ROUTE_DEPTH,
            device
        );
        let data = self.get_data(&path).await?;
        let mut records = decode_record_list(channel, &data);
        records.truncate(limit);
        Ok(records)
    }

    async fn submit_event(&self, submission: EventSubmission) -> PanelResult<EventRecord> {
        let channel = submission.channel();
        let body = match &submission {
            EventSubmission::Movement(cmd) => json!({
                "device_id": cmd.device.0,
                "status_clave": cmd.code,
                "source": "manual",
                "sequence_id": cmd.sequence.map(|s| s.0),
            }),
            EventSubmission::Obstacle(report) => json!({
                "device_id": report.device.0,
                "status_clave": report.code,
                "distance_cm": report.distance_cm,
                "auto_react": report.auto_react as u8,
                "back_ms": report.back_ms,
            }),
        };
        let path = format!("/api/{}/add", channel.wire_name());
        let data = self.post_data(&path, &body, false).await?;
        Ok(carbot_core::decode_event(channel, &data))
    }

    async fn create_sequence(
        &self,
        request: CreateSequenceRequest,
    ) -> PanelResult<CreatedSequence> {
        let steps_json = serde_json::to_string(&request.steps)
            .map_err(|e| PanelError::Decode(e.to_string()))?;
        let body = json!({
            "name": request.name,
            "owner_device_id": request.owner.0,
            "steps_json": steps_json,
        });
        let data = self.post_data("/api/demo/create", &body, true).await?;
        decode_created(&data, &request.name)
    }

    async fn list_sequences(&self, limit: usize) -> PanelResult<Vec<SequenceSummary>> {
        let path = format!("/api/demo/last{}", LISTING_ROUTE_DEPTH);
        let data = self.get_data(&path).await?;
        let mut list = decode_sequence_list(&data);
        list.truncate(limit);
        Ok(list)
    }

    async fn run_sequence(&self, request: RunSequenceRequest) -> PanelResult<RunReceipt> {
        let body = json!({
            "sequence_id": request.sequence.0,
            "device_id": request.device.0,
            "start_delay_ms": request.start_delay_ms,
        });
        let data = self.post_data("/api/demo/run", &body, false).await?;
        let accepted = data.get("accepted").and_then(Value::as_bool).unwrap_or(true);
        Ok(RunReceipt { accepted })
    }

    async fn subscribe(&self) -> PanelResult<Box<dyn PushStream>> {
        let stream = WsPushStream::connect(&push_url(&self.base)).await?;
        Ok(Box::new(stream))
    }
}
