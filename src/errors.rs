// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    /// Credentials file, benchmark script or data repository is absent, or a
    /// required parameter is empty.
    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    #[error("Failed to spawn '{program}': {source}")]
    SpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("A run is already active (run {run_id}, '{label}')")]
    AlreadyRunning { run_id: u64, label: String },

    #[error("'{command}' failed with {}", describe_exit(*.code))]
    ChildProcessFailure { command: String, code: Option<i32> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "termination by signal".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BenchError>;
