//! Demo step sequencer.

use std::sync::Arc;

use tracing::{debug, warn};

use carbot_core::{
    Catalog, Channel, CreatedSequence, DemoStep, DeviceId, EventTime, PanelError, PanelResult,
    RunReceipt, SequenceId, SequenceSummary, MIN_STEP_DURATION_MS,
};
use carbot_transport::{CreateSequenceRequest, RunSequenceRequest, Transport};

/// How many recent sequences `refresh` pulls.
const LISTING_LIMIT: usize = 20;

/// Direction for a step reorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

/// Client-side builder and driver for demo sequences.
pub struct DemoSequencer {
    catalog: Arc<dyn Catalog>,
    steps: Vec<DemoStep>,
    known: Vec<SequenceSummary>,
    selected: Option<SequenceId>,
}

impl DemoSequencer {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        DemoSequencer {
            catalog,
            steps: Vec::new(),
            known: Vec::new(),
            selected: None,
        }
    }

    pub fn steps(&self) -> &[DemoStep] {
        &self.steps
    }

    pub fn known(&self) -> &[SequenceSummary] {
        &self.known
    }

    pub fn selected(&self) -> Option<SequenceId> {
        self.selected
    }

    pub fn select(&mut self, id: SequenceId) {
        self.selected = Some(id);
    }

    /// Append a step. Rejects codes outside the movement catalog and
    /// durations below the firmware minimum; no clamping.
    pub fn add_step(&mut self, code: i64, duration_ms: u32) -> PanelResult<()> {
        if !self.catalog.contains(Channel::Movement, code) {
            return Err(PanelError::Validation(format!(
                "movement code {code} is not in the catalog"
            )));
        }
        if duration_ms < MIN_STEP_DURATION_MS {
            return Err(PanelError::Validation(format!(
                "step duration {duration_ms} ms is below the {MIN_STEP_DURATION_MS} ms minimum"
            )));
        }
        self.steps.push(DemoStep::new(code, duration_ms));
        Ok(())
    }

    /// Swap a step with its neighbor. Out-of-range moves are no-ops.
    pub fn move_step(&mut self, index: usize, direction: StepDirection) {
        let target = match direction {
            StepDirection::Up => index.checked_sub(1),
            StepDirection::Down => index.checked_add(1),
        };
        if let Some(target) = target {
            if index < self.steps.len() && target < self.steps.len() {
                self.steps.swap(index, target);
            }
        }
    }

    /// Remove a step. Out-of-range indices are no-ops.
    pub fn remove_step(&mut self, index: usize) {
        if index < self.steps.len() {
            self.steps.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Seed the canonical square-ish demo: forward, turn, forward, turn
    /// back, stop.
    pub fn load_example(&mut self) {
        self.steps = vec![
            DemoStep::new(1, 800),
            DemoStep::new(8, 500),
            DemoStep::new(1, 800),
            DemoStep::new(9, 500),
            DemoStep::new(3, 300),
        ];
    }

    /// Refresh the recent-sequence listing. A selection that disappeared
    /// from the listing is cleared.
    pub async fn refresh(&mut self, transport: &dyn Transport) -> PanelResult<&[SequenceSummary]> {
        let list = transport.list_sequences(LISTING_LIMIT).await?;
        if let Some(selected) = self.selected {
            if !list.iter().any(|s| s.id == selected) {
                debug!(%selected, "selected sequence no longer listed, clearing");
                self.selected = None;
            }
        }
        self.known = list;
        Ok(&self.known)
    }

    /// Create the built sequence on the backend.
    ///
    /// An empty name is synthesized from the current time. On a
    /// duplicate-name conflict, retries exactly once with a uniqueness
    /// suffix; the returned `CreatedSequence` carries the name actually
    /// stored. A failure after the retry is terminal.
    pub async fn create(
        &mut self,
        transport: &dyn Transport,
        name: &str,
        owner: DeviceId,
    ) -> PanelResult<CreatedSequence> {
        if self.steps.is_empty() {
            return Err(PanelError::Validation(String::from(
                "a sequence needs at least one step",
            )));
        }
        let name = name.trim();
        let requested = if name.is_empty() {
            format!("DEMO_{}", EventTime::now().as_millis())
        } else {
            name.to_string()
        };

        let request = CreateSequenceRequest {
            name: requested.clone(),
            owner,
            steps: self.steps.clone(),
        };
        match transport.create_sequence(request.clone()).await {
            Ok(created) => Ok(created),
            Err(err) if err.is_conflict() => {
                let renamed = format!("{}_{}", requested, EventTime::now().as_millis());
                warn!(%err, %renamed, "sequence name taken, retrying once");
                transport
                    .create_sequence(CreateSequenceRequest {
                        name: renamed,
                        ..request
                    })
                    .await
                    .map_err(|retry_err| PanelError::CreateFailed(retry_err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Trigger execution of the selected sequence. Single call, no retry.
    pub async fn run(
        &self,
        transport: &dyn Transport,
        device: DeviceId,
        start_delay_ms: u32,
    ) -> PanelResult<RunReceipt> {
        let sequence = self
            .selected
            .ok_or_else(|| PanelError::Validation(String::from("no sequence selected")))?;
        let receipt = transport
            .run_sequence(RunSequenceRequest {
                sequence,
                device,
                start_delay_ms,
            })
            .await?;
        if !receipt.accepted {
            return Err(PanelError::RunFailed(format!(
                "backend declined to run sequence {sequence}"
            )));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbot_core::StaticCatalog;

    fn sequencer() -> DemoSequencer {
        DemoSequencer::new(Arc::new(StaticCatalog))
    }

    #[test]
    fn test_add_step_unknown_code_rejected() {
        let mut s = sequencer();
        let err = s.add_step(99, 500).unwrap_err();
        assert!(matches!(err, PanelError::Validation(_)));
        assert!(s.steps().is_empty());
    }

    #[test]
    fn test_add_step_short_duration_rejected() {
        let mut s = sequencer();
        let err = s.add_step(1, 99).unwrap_err();
        assert!(matches!(err, PanelError::Validation(_)));
        assert!(s.steps().is_empty());
        // The boundary itself is accepted.
        s.add_step(1, 100).unwrap();
        assert_eq!(s.steps().len(), 1);
    }

    #[test]
    fn test_move_step_swaps_neighbors() {
        let mut s = sequencer();
        s.add_step(1, 800).unwrap();
        s.add_step(2, 400).unwrap();
        s.add_step(3, 300).unwrap();

        s.move_step(2, StepDirection::Up);
        let codes: Vec<_> = s.steps().iter().map(|st| st.code).collect();
        assert_eq!(codes, vec![1, 3, 2]);

        s.move_step(0, StepDirection::Down);
        let codes: Vec<_> = s.steps().iter().map(|st| st.code).collect();
        assert_eq!(codes, vec![3, 1, 2]);
    }

    #[test]
    fn test_move_step_out_of_range_is_noop() {
        let mut s = sequencer();
        s.add_step(1, 800).unwrap();
        s.move_step(0, StepDirection::Up);
        s.move_step(0, StepDirection::Down);
        s.move_step(5, StepDirection::Up);
        assert_eq!(s.steps().len(), 1);
        assert_eq!(s.steps()[0].code, 1);
    }

    #[test]
    fn test_remove_step_out_of_range_is_noop() {
        let mut s = sequencer();
        s.add_step(1, 800).unwrap();
        s.remove_step(3);
        assert_eq!(s.steps().len(), 1);
        s.remove_step(0);
        assert!(s.steps().is_empty());
    }

    #[test]
    fn test_load_example_then_clear() {
        let mut s = sequencer();
        s.load_example();
        assert_eq!(s.steps().len(), 5);
        assert_eq!(s.steps()[0], DemoStep::new(1, 800));
        s.clear();
        assert!(s.steps().is_empty());
    }
}
