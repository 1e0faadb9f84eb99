// src/exec/runner.rs

//! The runner loop: sole owner of the active run.
//!
//! Every state transition (start, cancel, finish, status query) is a message
//! to one Tokio task, so a `start` can never race a `cancel` or a finishing
//! run. [`ProcessRunner`] is the cheap, cloneable client side.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::errors::{BenchError, Result};
use crate::exec::handle::RunHandle;
use crate::exec::pipe::{spawn_merged, spawn_reader, SpawnedChild};
use crate::exec::post_step::{run_post_step, PostStepReport};
use crate::exec::supervisor::{supervise, Supervision};
use crate::exec::CommandSpec;
use crate::output::Classifier;
use crate::types::{RunId, RunnerStatus};

/// Knobs shared by every run of one runner.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub classifier: Arc<Classifier>,
    /// How long to keep reading output after the child exited.
    pub drain_grace: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            classifier: Arc::new(Classifier::builtin()),
            drain_grace: Duration::from_secs(2),
        }
    }
}

/// Messages handled by the runner loop.
#[derive(Debug)]
pub(crate) enum RunnerCommand {
    Start {
        command: CommandSpec,
        reply: oneshot::Sender<Result<RunHandle>>,
    },
    Cancel {
        run_id: RunId,
        reply: oneshot::Sender<bool>,
    },
    /// Sent by a supervisor just before it closes the consumer's stream.
    Finished { run_id: RunId },
    Status {
        reply: oneshot::Sender<RunnerStatus>,
    },
}

/// Internal record of the currently running child.
///
/// - `cancel` fires the supervisor's kill path; taken on first use.
/// - `supervisor` is the Tokio task driving the child.
struct ActiveRun {
    run_id: RunId,
    label: String,
    cancel: Option<oneshot::Sender<()>>,
    supervisor: tokio::task::JoinHandle<()>,
}

/// Client handle to a runner loop.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tx: mpsc::Sender<RunnerCommand>,
    options: Arc<RunnerOptions>,
}

/// Spawn a runner loop on the current Tokio runtime.
pub fn spawn_runner(options: RunnerOptions) -> ProcessRunner {
    let (tx, mut rx) = mpsc::channel::<RunnerCommand>(32);
    let options = Arc::new(options);

    let mut state = RunnerState {
        active: None,
        next_id: 1,
        options: Arc::clone(&options),
        self_tx: tx.downgrade(),
    };

    tokio::spawn(async move {
        info!("runner loop started");

        while let Some(command) = rx.recv().await {
            state.handle(command);
        }

        info!("runner loop finished (channel closed)");
    });

    ProcessRunner { tx, options }
}

impl ProcessRunner {
    /// Start a child process.
    ///
    /// Fails with `AlreadyRunning` while another run is active (nothing is
    /// spawned), or `SpawnError` when the program or script is missing or the
    /// OS refuses the process.
    pub async fn start(&self, command: impl Into<CommandSpec>) -> Result<RunHandle> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::Start {
            command: command.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| loop_gone())?
    }

    /// Request termination of the run behind `handle`.
    ///
    /// Returns `true` if a kill was requested by this call. Cancelling a run
    /// that already finished, or cancelling twice, is a no-op returning
    /// `false`.
    pub async fn cancel(&self, handle: &RunHandle) -> bool {
        self.cancel_id(handle.id()).await
    }

    pub async fn cancel_id(&self, run_id: RunId) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .send(RunnerCommand::Cancel { run_id, reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn status(&self) -> Result<RunnerStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(RunnerCommand::Status { reply }).await?;
        rx.await.map_err(|_| loop_gone())
    }

    /// Run a short command to completion, outside the single-run slot.
    pub async fn run_post_step(&self, command: &CommandSpec) -> Result<PostStepReport> {
        run_post_step(command, &self.options.classifier).await
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    async fn send(&self, command: RunnerCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| loop_gone())
    }
}

fn loop_gone() -> BenchError {
    BenchError::Other(anyhow!("runner loop has shut down"))
}

struct RunnerState {
    active: Option<ActiveRun>,
    next_id: RunId,
    options: Arc<RunnerOptions>,
    /// Weak so that the loop ends once every `ProcessRunner` is dropped.
    self_tx: mpsc::WeakSender<RunnerCommand>,
}

impl RunnerState {
    fn handle(&mut self, command: RunnerCommand) {
        match command {
            RunnerCommand::Start { command, reply } => {
                let result = self.start(command);
                if let Err(Ok(orphan)) = reply.send(result) {
                    debug!(run_id = orphan.id(), "start requester went away; cancelling orphaned run");
                    self.cancel(orphan.id());
                }
            }
            RunnerCommand::Cancel { run_id, reply } => {
                let _ = reply.send(self.cancel(run_id));
            }
            RunnerCommand::Finished { run_id } => self.finished(run_id),
            RunnerCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.supervisor.is_finished())
    }

    fn start(&mut self, command: CommandSpec) -> Result<RunHandle> {
        if let Some(active) = self.active.as_ref().filter(|_| self.is_busy()) {
            debug!(
                run_id = active.run_id,
                requested = %command.label,
                "run already active; rejecting start"
            );
            return Err(BenchError::AlreadyRunning {
                run_id: active.run_id,
                label: active.label.clone(),
            });
        }

        let run_id = self.next_id;
        self.next_id += 1;

        let SpawnedChild { child, output } = spawn_merged(&command)?;

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<String>();
        // On failure `child` is dropped and killed (kill_on_drop).
        spawn_reader(output, run_id, raw_tx)?;

        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        info!(
            run_id,
            label = %command.label,
            pid = child.id(),
            cmd = %command,
            "started child process"
        );

        let supervisor = tokio::spawn(supervise(Supervision {
            run_id,
            label: command.label.clone(),
            child,
            raw_rx,
            lines_tx,
            cancel_rx,
            outcome_tx,
            runner_tx: self.self_tx.upgrade(),
            classifier: Arc::clone(&self.options.classifier),
            drain_grace: self.options.drain_grace,
        }));

        self.active = Some(ActiveRun {
            run_id,
            label: command.label.clone(),
            cancel: Some(cancel_tx),
            supervisor,
        });

        Ok(RunHandle::new(run_id, command.label, lines_rx, outcome_rx))
    }

    fn cancel(&mut self, run_id: RunId) -> bool {
        let Some(active) = self.active.as_mut().filter(|a| a.run_id == run_id) else {
            debug!(run_id, "cancel for inactive run; ignoring");
            return false;
        };

        match active.cancel.take() {
            Some(cancel) => {
                info!(run_id, label = %active.label, "cancelling active run");
                if cancel.send(()).is_err() {
                    debug!(run_id, "run already finished while cancelling");
                    return false;
                }
                true
            }
            None => {
                debug!(run_id, "run already cancelled");
                false
            }
        }
    }

    fn finished(&mut self, run_id: RunId) {
        if self.active.as_ref().is_some_and(|a| a.run_id == run_id) {
            debug!(run_id, "active run finished; runner idle");
            self.active = None;
        }
    }

    fn status(&self) -> RunnerStatus {
        match &self.active {
            Some(active) if self.is_busy() => RunnerStatus::Running {
                run_id: active.run_id,
                label: active.label.clone(),
            },
            _ => RunnerStatus::Idle,
        }
    }
}
