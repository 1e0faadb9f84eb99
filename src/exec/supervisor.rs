// src/exec/supervisor.rs

//! Per-run supervisor task.
//!
//! Forwards classified lines to the consumer, waits for the child to exit,
//! honours cancellation, and reports the outcome back to both the consumer
//! and the runner loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::exec::runner::RunnerCommand;
use crate::output::{Classifier, LogLine};
use crate::types::{LogTag, RunId, RunOutcome};

pub(crate) struct Supervision {
    pub run_id: RunId,
    pub label: String,
    pub child: Child,
    pub raw_rx: mpsc::UnboundedReceiver<String>,
    pub lines_tx: mpsc::UnboundedSender<LogLine>,
    pub cancel_rx: oneshot::Receiver<()>,
    pub outcome_tx: oneshot::Sender<RunOutcome>,
    pub runner_tx: Option<mpsc::Sender<RunnerCommand>>,
    pub classifier: Arc<Classifier>,
    pub drain_grace: Duration,
}

/// Drive one child process to completion.
///
/// The consumer sees, in order: every line the child wrote, then at most one
/// terminal line describing a cancellation or failure, then end of stream.
/// The runner loop is told the run finished before the outcome is reported
/// and before the stream closes, so a caller that observed either can
/// immediately start another run. Once the child has exited, cancellation
/// is refused.
pub(crate) async fn supervise(s: Supervision) {
    let Supervision {
        run_id,
        label,
        mut child,
        mut raw_rx,
        lines_tx,
        mut cancel_rx,
        outcome_tx,
        runner_tx,
        classifier,
        drain_grace,
    } = s;

    let forward = |text: String| {
        let line = LogLine::classified(text, &classifier);
        // The consumer may have dropped its handle; keep supervising anyway.
        let _ = lines_tx.send(line);
    };

    let mut cancelled = false;
    let mut cancel_armed = true;
    let mut stream_open = true;

    let status = loop {
        tokio::select! {
            maybe_line = raw_rx.recv(), if stream_open => {
                match maybe_line {
                    Some(text) => forward(text),
                    None => {
                        debug!(run_id, label = %label, "output stream closed; waiting for exit");
                        stream_open = false;
                    }
                }
            }

            status_res = child.wait() => {
                break status_res;
            }

            cancel = &mut cancel_rx, if cancel_armed => {
                cancel_armed = false;
                match cancel {
                    Ok(()) => {
                        info!(run_id, label = %label, "cancellation requested; killing child process");
                        cancelled = true;
                        if let Err(e) = child.start_kill() {
                            warn!(
                                run_id,
                                label = %label,
                                error = %e,
                                "failed to kill child process on cancellation"
                            );
                        }
                    }
                    Err(_) => {
                        debug!(run_id, label = %label, "cancel channel closed without explicit cancellation");
                    }
                }
            }
        }
    };

    // The child is gone; a late cancel must report that nothing was killed.
    drop(cancel_rx);

    // Drain what the child wrote before exiting. Bounded, since a descendant
    // may inherit the pipe and keep it open indefinitely.
    if stream_open {
        let drain = async {
            while let Some(text) = raw_rx.recv().await {
                forward(text);
            }
        };
        if tokio::time::timeout(drain_grace, drain).await.is_err() {
            warn!(
                run_id,
                label = %label,
                grace_ms = drain_grace.as_millis() as u64,
                "output pipe still open after child exit; closing stream"
            );
        }
    }

    let outcome = match status {
        _ if cancelled => RunOutcome::Cancelled,
        Ok(status) => match status.code() {
            Some(code) => RunOutcome::Exited(code),
            None => RunOutcome::Signalled,
        },
        Err(e) => {
            warn!(run_id, label = %label, error = %e, "failed waiting for child process");
            RunOutcome::Lost
        }
    };

    info!(run_id, label = %label, ?outcome, "child process finished");

    if let Some(line) = terminal_line(&label, outcome) {
        let _ = lines_tx.send(line);
    }

    // Queued before the outcome is visible, so a `start` issued by a caller
    // woken by the outcome always lands behind it.
    if let Some(tx) = runner_tx {
        if tx.send(RunnerCommand::Finished { run_id }).await.is_err() {
            debug!(run_id, "runner loop gone before finish notification");
        }
    }
    let _ = outcome_tx.send(outcome);

    // `lines_tx` drops here: end of stream for the consumer.
}

/// The line appended after the child's own output, if any.
pub fn terminal_line(label: &str, outcome: RunOutcome) -> Option<LogLine> {
    match outcome {
        RunOutcome::Exited(0) => None,
        RunOutcome::Exited(code) => Some(LogLine::error(format!(
            "Error: {label} exited with status {code}"
        ))),
        RunOutcome::Signalled => Some(LogLine::error(format!(
            "Error: {label} was terminated by a signal"
        ))),
        RunOutcome::Cancelled => Some(LogLine::new(
            format!("{label} stopped by user."),
            LogTag::Warning,
        )),
        RunOutcome::Lost => Some(LogLine::error(format!(
            "Error: lost track of {label} process"
        ))),
    }
}
