// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `benchrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "benchrun",
    version,
    about = "Launch benchmark runs, stream their output, and re-run the latest tests.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `benchrun.toml` in the current directory is used when it
    /// exists; otherwise built-in defaults apply.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BENCHRUN_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the commands that would run, without spawning them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a benchmark, then generate its stats.
    Run(RunArgs),

    /// Re-run the tests of the most recent benchmark run.
    RerunLatest,

    /// Check preconditions (credentials, script, data repository) only.
    Check {
        /// Clone the data repository if it is missing.
        #[arg(long)]
        clone_missing: bool,
    },

    /// Generate stats for an existing run directory.
    Stats {
        /// Name of the run directory under the results root.
        run_name: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Exercise to run (e.g. `exercises/practice/say`), or `all`.
    #[arg(long, value_name = "PATH")]
    pub test_path: Option<String>,

    /// Model identifier passed to the benchmark.
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Edit format passed to the benchmark.
    #[arg(long, value_name = "FORMAT")]
    pub edit_format: Option<String>,

    /// Number of benchmark threads (at least 1).
    #[arg(long, value_name = "N")]
    pub threads: Option<u32>,

    /// Clone the data repository if it is missing.
    #[arg(long)]
    pub clone_missing: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
