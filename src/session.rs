// src/session.rs

//! One user-facing operation at a time: run a benchmark, re-run the latest
//! tests, generate stats, or just check preconditions.
//!
//! The session is the "caller" of the process runner. Everything it has to
//! say (headers, child output, completion notes, failures) goes through a
//! single [`OutputSink`]; failures are emitted as `Error: …` lines *and*
//! returned, so the CLI can pick an exit code without printing twice.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::discovery::{find_latest_run, rerun_command};
use crate::errors::{BenchError, Result};
use crate::exec::{CommandSpec, ProcessRunner, RunHandle};
use crate::fs::{FileSystem, RealFileSystem};
use crate::output::{LogLine, OutputSink};
use crate::preflight::{GitCliCloner, Preflight, RepoCloner};
use crate::request::{base_env_overlay, stats_command, utf8_overlay, RunRequest, RunRequestBuilder};
use crate::types::RunOutcome;

/// Parameters of a benchmark run; `None` falls back to `[defaults]`.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub test_path: Option<String>,
    pub model: Option<String>,
    pub edit_format: Option<String>,
    pub threads: Option<u32>,
    /// Clone the data repository if it is missing.
    pub clone_missing: bool,
    /// Fix the run timestamp (tests); `None` reads the clock.
    pub timestamp: Option<String>,
}

/// How an operation that launched (or would have launched) a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_name: Option<String>,
    pub outcome: RunOutcome,
    pub results_dir: Option<PathBuf>,
}

impl RunSummary {
    /// Conventional process exit code: 0 on success, 130 when stopped by the
    /// user, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Exited(0) => 0,
            RunOutcome::Cancelled => 130,
            _ => 1,
        }
    }
}

pub struct Session {
    config: ConfigFile,
    runner: ProcessRunner,
    fs: Arc<dyn FileSystem>,
    cloner: Arc<dyn RepoCloner>,
    stop: watch::Receiver<bool>,
}

impl Session {
    /// `stop` flips to `true` when the user asks to stop (Ctrl-C).
    pub fn new(config: ConfigFile, runner: ProcessRunner, stop: watch::Receiver<bool>) -> Self {
        let cloner = GitCliCloner::new(Arc::clone(&runner.options().classifier));
        Self {
            config,
            runner,
            fs: Arc::new(RealFileSystem),
            cloner: Arc::new(cloner),
            stop,
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_cloner(mut self, cloner: Arc<dyn RepoCloner>) -> Self {
        self.cloner = cloner;
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    /// Build the request a `run` with these parameters would execute.
    pub fn build_request(&self, params: &RunParams) -> Result<RunRequest> {
        let mut builder = RunRequestBuilder::from_config(&self.config);
        if let Some(test_path) = &params.test_path {
            builder = builder.test_path(test_path.clone());
        }
        if let Some(model) = &params.model {
            builder = builder.model(model.clone());
        }
        if let Some(edit_format) = &params.edit_format {
            builder = builder.edit_format(edit_format.clone());
        }
        if let Some(threads) = params.threads {
            builder = builder.threads(threads);
        }
        if let Some(timestamp) = &params.timestamp {
            builder = builder.timestamp(timestamp.clone());
        }
        builder.build()
    }

    /// Preflight checks only.
    pub async fn check(&mut self, sink: &mut dyn OutputSink, allow_clone: bool) -> Result<()> {
        let result = self.preflight(sink, allow_clone).await;
        match result {
            Ok(()) => {
                self.say(sink, "All preconditions satisfied; ready to run.");
                Ok(())
            }
            Err(e) => Err(report(sink, e)),
        }
    }

    /// Validate, run the benchmark, then generate stats.
    pub async fn run_benchmark(
        &mut self,
        params: &RunParams,
        sink: &mut dyn OutputSink,
    ) -> Result<RunSummary> {
        let result = self.run_benchmark_inner(params, sink).await;
        result.map_err(|e| report(sink, e))
    }

    async fn run_benchmark_inner(
        &mut self,
        params: &RunParams,
        sink: &mut dyn OutputSink,
    ) -> Result<RunSummary> {
        let allow_clone = params.clone_missing || self.config.repo.clone_if_missing;
        self.preflight(sink, allow_clone).await?;
        let request = self.build_request(params)?;
        let results_dir = self.config.paths.results_root.join(request.run_name());

        self.say(sink, "Running benchmark...");
        self.say(sink, &format!("Run name: {}", request.run_name()));
        self.say(sink, &format!("Using model: {}", request.model()));
        self.say(sink, &format!("Edit format: {}", request.edit_format()));
        self.say(sink, &format!("Threads: {}", request.threads()));

        let outcome = match self.launch(&request, sink).await? {
            Some(outcome) => outcome,
            None => RunOutcome::Cancelled,
        };

        let summary = RunSummary {
            run_name: Some(request.run_name().to_string()),
            outcome,
            results_dir: Some(results_dir.clone()),
        };

        if !outcome.is_success() {
            // The runner already emitted the terminal line.
            info!(?outcome, "benchmark did not complete; skipping stats");
            return Ok(summary);
        }

        self.say(sink, "Info: generating benchmark stats...");
        let stats = request.stats_command(&results_dir);
        let report = self.runner.run_post_step(&stats).await?;
        for line in &report.lines {
            sink.emit(line);
        }
        report.check()?;

        self.say(
            sink,
            &format!(
                "Benchmark completed! Results are in {}",
                results_dir.display()
            ),
        );
        self.say(
            sink,
            &format!("You can view the stats again by running: {stats}"),
        );

        Ok(summary)
    }

    /// Re-execute the tests of the most recent run.
    pub async fn rerun_latest(&mut self, sink: &mut dyn OutputSink) -> Result<RunSummary> {
        let result = self.rerun_latest_inner(sink).await;
        result.map_err(|e| report(sink, e))
    }

    async fn rerun_latest_inner(&mut self, sink: &mut dyn OutputSink) -> Result<RunSummary> {
        let cmd = self.rerun_plan()?;
        debug!(command = %cmd, "re-running latest tests");
        self.say(sink, &format!("Re-running tests with: {cmd}"));

        let outcome = match self.launch(cmd, sink).await? {
            Some(outcome) => outcome,
            None => RunOutcome::Cancelled,
        };

        if outcome.is_success() {
            self.say(sink, "Re-run completed.");
        }

        Ok(RunSummary {
            run_name: None,
            outcome,
            results_dir: None,
        })
    }

    /// Locate the latest run and build the command that re-runs its tests.
    pub fn rerun_plan(&self) -> Result<CommandSpec> {
        let target = find_latest_run(
            self.fs.as_ref(),
            &self.config.paths.results_root,
            &self.config.rerun.pattern,
            std::slice::from_ref(&self.config.paths.data_repo),
        )?;
        Ok(rerun_command(
            &self.config.python.interpreter,
            &target.test_dir,
            &self.config.rerun.pattern,
        )
        .envs(&utf8_overlay(cfg!(windows))))
    }

    /// Run only the stats post-step for an existing run directory.
    pub async fn stats(&mut self, run_name: &str, sink: &mut dyn OutputSink) -> Result<RunSummary> {
        let result = self.stats_inner(run_name, sink).await;
        result.map_err(|e| report(sink, e))
    }

    async fn stats_inner(&mut self, run_name: &str, sink: &mut dyn OutputSink) -> Result<RunSummary> {
        let results_dir = self.config.paths.results_root.join(run_name);
        if !self.fs.is_dir(&results_dir) {
            return Err(BenchError::NotFound(format!(
                "No results directory at {}",
                results_dir.display()
            )));
        }
        self.preflight_view().check_script()?;

        self.say(sink, "Info: generating benchmark stats...");
        let stats = self.stats_plan(&results_dir);
        let report = self.runner.run_post_step(&stats).await?;
        for line in &report.lines {
            sink.emit(line);
        }
        report.check()?;

        Ok(RunSummary {
            run_name: Some(run_name.to_string()),
            outcome: RunOutcome::Exited(0),
            results_dir: Some(results_dir),
        })
    }

    /// The stats command for a results directory.
    pub fn stats_plan(&self, results_dir: &Path) -> CommandSpec {
        let mut env = base_env_overlay(&self.config.paths.results_root, cfg!(windows));
        env.extend(self.config.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        stats_command(
            &self.config.python.interpreter,
            &self.config.paths.benchmark_script,
            results_dir,
            &env,
        )
    }

    fn preflight_view(&self) -> Preflight<'_> {
        Preflight {
            fs: self.fs.as_ref(),
            cloner: self.cloner.as_ref(),
            paths: &self.config.paths,
            repo: &self.config.repo,
        }
    }

    async fn preflight(&self, sink: &mut dyn OutputSink, allow_clone: bool) -> Result<()> {
        self.preflight_view().check(sink, allow_clone).await
    }

    /// Start `command` and pump its output into `sink` until end of stream.
    ///
    /// Returns `None` if a stop was requested before anything was spawned.
    async fn launch(
        &mut self,
        command: impl Into<CommandSpec>,
        sink: &mut dyn OutputSink,
    ) -> Result<Option<RunOutcome>> {
        if *self.stop.borrow() {
            info!("stop requested before start; not spawning");
            return Ok(None);
        }
        let handle = self.runner.start(command).await?;
        Ok(Some(self.pump(handle, sink).await))
    }

    async fn pump(&mut self, mut handle: RunHandle, sink: &mut dyn OutputSink) -> RunOutcome {
        let mut stop_armed = true;

        loop {
            tokio::select! {
                line = handle.next_line() => match line {
                    Some(line) => sink.emit(&line),
                    None => break,
                },

                changed = self.stop.changed(), if stop_armed => {
                    match changed {
                        Ok(()) if *self.stop.borrow() => {
                            stop_armed = false;
                            info!(run_id = handle.id(), "stop requested; cancelling run");
                            self.runner.cancel(&handle).await;
                        }
                        Ok(()) => {}
                        Err(_) => stop_armed = false,
                    }
                }
            }
        }

        handle.outcome().await
    }

    fn say(&self, sink: &mut dyn OutputSink, text: &str) {
        sink.emit(&LogLine::classified(text, &self.runner.options().classifier));
    }
}

/// Emit `err` as an `Error:` line and hand it back.
fn report(sink: &mut dyn OutputSink, err: BenchError) -> BenchError {
    sink.emit(&LogLine::error(format!("Error: {err}")));
    err
}
