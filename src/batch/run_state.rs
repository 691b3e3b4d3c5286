use serde::Serialize;
use uuid::Uuid;

use crate::api::model::Identifier;

use super::outcome::{BatchSummary, Outcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    /// Finished, results kept visible until the settle delay runs out.
    Settling,
}

/// Transient state of a single batch run, published to observers as snapshots.
///
/// `outcomes.len() <= completed_count <= total_count` holds at all times and
/// outcomes keep the order of `selection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunState {
    pub run_id: Option<Uuid>,
    pub phase: RunPhase,
    pub selection: Vec<Identifier>,
    pub completed_count: usize,
    pub total_count: usize,
    pub outcomes: Vec<Outcome>,
    pub summary: Option<BatchSummary>,
}

impl RunState {
    pub fn start(run_id: Uuid, selection: Vec<Identifier>) -> Self {
        Self {
            run_id: Some(run_id),
            phase: RunPhase::Running,
            total_count: selection.len(),
            outcomes: Vec::with_capacity(selection.len()),
            selection,
            completed_count: 0,
            summary: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    /// Records the next outcome. Outcomes past `total_count` are ignored.
    pub fn record(&mut self, outcome: Outcome) {
        if self.completed_count >= self.total_count {
            return;
        }

        self.outcomes.push(outcome);
        self.completed_count += 1;
    }

    pub fn finish(&mut self) -> BatchSummary {
        let summary = BatchSummary::from_outcomes(&self.outcomes);
        self.phase = RunPhase::Settling;
        self.summary = Some(summary);

        summary
    }

    /// `round(100 * completed / total)`, 0 when nothing was selected.
    pub fn progress_percent(&self) -> u8 {
        if self.total_count == 0 {
            return 0;
        }

        ((200 * self.completed_count + self.total_count) / (2 * self.total_count)) as u8
    }
}
