// src/lib.rs

pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod output;
pub mod preflight;
pub mod request;
pub mod session;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::load_or_default;
use crate::exec::{spawn_runner, RunnerOptions};
use crate::output::ConsoleSink;
use crate::session::{RunParams, Session};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - the process runner actor
/// - Ctrl-C handling (first press stops the active run, second exits)
/// - the requested subcommand
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    let classifier = Arc::new(cfg.classifier()?);

    let runner = spawn_runner(RunnerOptions {
        classifier,
        drain_grace: cfg.drain_grace(),
    });

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut session = Session::new(cfg, runner, stop_rx);

    if args.dry_run {
        print_dry_run(&session, &args.command)?;
        return Ok(0);
    }

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl-C received; stopping the active run");
        let _ = stop_tx.send(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second Ctrl-C; exiting immediately");
            std::process::exit(130);
        }
    });

    let mut sink = ConsoleSink::new();
    let result = match &args.command {
        Command::Run(run) => {
            let params = run_params(run);
            session
                .run_benchmark(&params, &mut sink)
                .await
                .map(|summary| summary.exit_code())
        }
        Command::RerunLatest => session
            .rerun_latest(&mut sink)
            .await
            .map(|summary| summary.exit_code()),
        Command::Check { clone_missing } => {
            let allow_clone = *clone_missing || session.config().repo.clone_if_missing;
            session.check(&mut sink, allow_clone).await.map(|()| 0)
        }
        Command::Stats { run_name } => session
            .stats(run_name, &mut sink)
            .await
            .map(|summary| summary.exit_code()),
    };

    // Failures were already written to the sink as `Error:` lines.
    Ok(result.unwrap_or_else(|e| {
        debug!(error = ?e, "operation failed");
        1
    }))
}

fn run_params(run: &cli::RunArgs) -> RunParams {
    RunParams {
        test_path: run.test_path.clone(),
        model: run.model.clone(),
        edit_format: run.edit_format.clone(),
        threads: run.threads,
        clone_missing: run.clone_missing,
        timestamp: None,
    }
}

/// Print the resolved command lines without spawning anything.
fn print_dry_run(session: &Session, command: &Command) -> Result<()> {
    let cfg = session.config();
    println!("benchrun dry-run");
    println!("  results_root = {}", cfg.paths.results_root.display());
    println!("  data_repo = {}", cfg.paths.data_repo.display());
    println!();

    match command {
        Command::Run(run) => {
            let request = session.build_request(&run_params(run))?;
            let results_dir = cfg.paths.results_root.join(request.run_name());
            println!("run name: {}", request.run_name());
            println!("  benchmark: {}", request.to_command());
            println!("  stats:     {}", request.stats_command(&results_dir));
            for (key, value) in request.env() {
                println!("  env: {key}={value}");
            }
        }
        Command::RerunLatest => {
            let cmd = session.rerun_plan()?;
            println!("  rerun: {cmd}");
        }
        Command::Check { .. } => {
            println!("  credentials_file = {}", cfg.paths.credentials_file.display());
            println!("  benchmark_script = {}", cfg.paths.benchmark_script.display());
        }
        Command::Stats { run_name } => {
            let results_dir = cfg.paths.results_root.join(run_name);
            println!("  stats: {}", session.stats_plan(&results_dir));
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
