use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::api::model::Identifier;

use super::{
    ItemProcessor, ListInvalidator,
    outcome::{BatchSummary, ItemProcessingFailure, Outcome},
    run_state::{RunPhase, RunState},
};

/// Wait between two consecutive calls of one run.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(300);
/// How long finished results stay visible before the run state is cleared.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTiming {
    pub pacing_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for BatchTiming {
    fn default() -> Self {
        Self {
            pacing_delay: DEFAULT_PACING_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartRejected {
    #[error("Selection is empty, nothing to process")]
    EmptySelection,

    #[error("A batch run is already in progress. [run_id = {0}]")]
    AlreadyRunning(Uuid),

    #[error("Batch runner is not available")]
    RunnerGone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub outcomes: Vec<Outcome>,
    pub summary: BatchSummary,
}

/// Handed out for an accepted run. Dropping it does not affect the run.
pub struct RunTicket {
    pub run_id: Uuid,
    pub total_count: usize,
    completion: oneshot::Receiver<BatchReport>,
}

impl RunTicket {
    /// Resolves once the list cache was invalidated and every outcome is recorded.
    pub async fn completed(self) -> anyhow::Result<BatchReport> {
        self.completion
            .await
            .map_err(|_| anyhow!("Batch run stopped before reporting. [run_id = {}]", self.run_id))
    }
}

enum BatchRunnerMessage {
    Start {
        selection: Vec<Identifier>,
        reply: oneshot::Sender<Result<RunTicket, StartRejected>>,
    },
}

#[derive(Clone)]
pub struct BatchRunnerHandle {
    sender: mpsc::Sender<BatchRunnerMessage>,
    state: watch::Receiver<RunState>,
}

impl BatchRunnerHandle {
    pub async fn start(&self, selection: Vec<Identifier>) -> Result<RunTicket, StartRejected> {
        let (reply, receiver) = oneshot::channel();

        self.sender
            .send(BatchRunnerMessage::Start { selection, reply })
            .await
            .map_err(|_| StartRejected::RunnerGone)?;

        receiver.await.map_err(|_| StartRejected::RunnerGone)?
    }

    pub fn snapshot(&self) -> RunState {
        self.state.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }
}

struct BatchRunner<TProcessor: ItemProcessor, TInvalidator: ListInvalidator> {
    processor: Arc<TProcessor>,
    invalidator: Arc<TInvalidator>,
    state: Arc<watch::Sender<RunState>>,
    timing: BatchTiming,
}

impl<TProcessor: ItemProcessor, TInvalidator: ListInvalidator> BatchRunner<TProcessor, TInvalidator> {
    fn handle_message(&mut self, message: BatchRunnerMessage) {
        match message {
            BatchRunnerMessage::Start { selection, reply } => {
                let result = self.handle_start(selection);

                if let Err(Ok(ticket)) = reply.send(result) {
                    warn!(
                        "Caller dropped before the run was acknowledged, run continues. [run_id = {}]",
                        ticket.run_id
                    );
                }
            }
        }
    }

    fn handle_start(&mut self, selection: Vec<Identifier>) -> Result<RunTicket, StartRejected> {
        if selection.is_empty() {
            info!("Ignoring batch start with an empty selection.");
            return Err(StartRejected::EmptySelection);
        }

        if let Some(run_id) = self.active_run() {
            warn!("Rejecting batch start, a run is in progress. [run_id = {run_id}]");
            return Err(StartRejected::AlreadyRunning(run_id));
        }

        let run_id = Uuid::new_v4();
        let total_count = selection.len();
        let (completion_sender, completion) = oneshot::channel();

        info!("Starting batch run. [run_id = {run_id}, total_count = {total_count}]");
        self.state
            .send_replace(RunState::start(run_id, selection.clone()));

        tokio::spawn(execute_run(
            run_id,
            selection,
            Arc::clone(&self.processor),
            Arc::clone(&self.invalidator),
            Arc::clone(&self.state),
            self.timing,
            completion_sender,
        ));

        Ok(RunTicket {
            run_id,
            total_count,
            completion,
        })
    }

    fn active_run(&self) -> Option<Uuid> {
        let state = self.state.borrow();
        if state.is_running() {
            state.run_id
        } else {
            None
        }
    }
}

async fn execute_run<TProcessor: ItemProcessor, TInvalidator: ListInvalidator>(
    run_id: Uuid,
    selection: Vec<Identifier>,
    processor: Arc<TProcessor>,
    invalidator: Arc<TInvalidator>,
    state: Arc<watch::Sender<RunState>>,
    timing: BatchTiming,
    completion: oneshot::Sender<BatchReport>,
) {
    let total_count = selection.len();
    let mut outcomes = Vec::with_capacity(total_count);

    for (index, identifier) in selection.into_iter().enumerate() {
        let outcome = match processor.process_one(&identifier).await {
            Ok(()) => {
                debug!("Item processed. [run_id = {run_id}, identifier = {identifier}]");
                Outcome::success(identifier)
            }
            Err(err) => {
                let failure = ItemProcessingFailure::new(identifier, err.to_string());
                warn!(
                    "Item processing failed. [run_id = {run_id}, identifier = {}, message = {}]",
                    failure.identifier, failure.message
                );
                Outcome::failure(failure)
            }
        };

        outcomes.push(outcome.clone());
        state.send_modify(|state| state.record(outcome));

        if index + 1 < total_count {
            tokio::time::sleep(timing.pacing_delay).await;
        }
    }

    // Lists must already be stale when observers see the run leave Running.
    invalidator.invalidate_list_cache().await;

    let summary = BatchSummary::from_outcomes(&outcomes);
    state.send_modify(|state| {
        state.finish();
    });
    info!(
        "Batch run completed. [run_id = {run_id}, succeeded = {}, failed = {}]",
        summary.succeeded, summary.failed
    );

    let report = BatchReport {
        run_id,
        outcomes,
        summary,
    };
    if completion.send(report).is_err() {
        debug!("Nobody is waiting for the batch report. [run_id = {run_id}]");
    }

    tokio::time::sleep(timing.settle_delay).await;

    // A newer run may already own the state.
    let cleared = state.send_if_modified(|state| {
        if state.run_id == Some(run_id) && state.phase == RunPhase::Settling {
            *state = RunState::default();
            true
        } else {
            false
        }
    });
    if cleared {
        debug!("Cleared settled batch run. [run_id = {run_id}]");
    }
}

pub fn start<TProcessor: ItemProcessor, TInvalidator: ListInvalidator>(
    processor: Arc<TProcessor>,
    invalidator: Arc<TInvalidator>,
    timing: BatchTiming,
) -> BatchRunnerHandle {
    let (sender, mut receiver) = mpsc::channel::<BatchRunnerMessage>(64);
    let (state_sender, state) = watch::channel(RunState::default());

    let mut runner = BatchRunner {
        processor,
        invalidator,
        state: Arc::new(state_sender),
        timing,
    };

    tokio::spawn(async move {
        while let Some(msg) = receiver.recv().await {
            runner.handle_message(msg);
        }

        info!("Last batch runner handle was dropped, stopping batch runner.");
    });

    BatchRunnerHandle { sender, state }
}
