// src/exec/handle.rs

//! Consumer side of one run: the ordered line stream and the final outcome.

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

use crate::output::LogLine;
use crate::types::{RunId, RunOutcome};

/// Result of a non-blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadNext {
    Line(LogLine),
    /// Nothing buffered right now; the run is still going.
    Empty,
    /// The child is gone and every buffered line has been delivered.
    EndOfStream,
}

/// Handle to a run started by [`ProcessRunner::start`](super::ProcessRunner::start).
///
/// Lines are delivered in the order the child wrote them. Dropping the
/// handle does not stop the child; cancel it through the runner.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    label: String,
    lines: mpsc::UnboundedReceiver<LogLine>,
    outcome: oneshot::Receiver<RunOutcome>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: RunId,
        label: String,
        lines: mpsc::UnboundedReceiver<LogLine>,
        outcome: oneshot::Receiver<RunOutcome>,
    ) -> Self {
        Self {
            run_id,
            label,
            lines,
            outcome,
        }
    }

    pub fn id(&self) -> RunId {
        self.run_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Next line, or `None` at end of stream.
    pub async fn next_line(&mut self) -> Option<LogLine> {
        self.lines.recv().await
    }

    /// Non-blocking variant of [`next_line`](Self::next_line) for callers
    /// polling from an event loop.
    pub fn try_next(&mut self) -> ReadNext {
        match self.lines.try_recv() {
            Ok(line) => ReadNext::Line(line),
            Err(TryRecvError::Empty) => ReadNext::Empty,
            Err(TryRecvError::Disconnected) => ReadNext::EndOfStream,
        }
    }

    /// Wait for the run to end and report how.
    ///
    /// Lines not yet read are discarded.
    pub async fn outcome(self) -> RunOutcome {
        self.outcome.await.unwrap_or(RunOutcome::Lost)
    }
}
