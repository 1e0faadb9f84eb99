// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Identifier assigned by the runner to each started process.
pub type RunId = u64;

/// Classification tag attached to every line of child output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTag {
    Info,
    Warning,
    Error,
    Success,
    #[default]
    Plain,
}

impl FromStr for LogTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(LogTag::Info),
            "warning" | "warn" => Ok(LogTag::Warning),
            "error" => Ok(LogTag::Error),
            "success" => Ok(LogTag::Success),
            "plain" => Ok(LogTag::Plain),
            other => Err(format!(
                "invalid log tag: {other} (expected info, warning, error, success or plain)"
            )),
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogTag::Info => "info",
            LogTag::Warning => "warning",
            LogTag::Error => "error",
            LogTag::Success => "success",
            LogTag::Plain => "plain",
        };
        f.write_str(s)
    }
}

/// How a child process ended, as observed by its supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own with the given code.
    Exited(i32),
    /// The process was terminated by a signal it did not receive from us.
    Signalled,
    /// The process was killed after a cancel request.
    Cancelled,
    /// The supervisor went away before reporting (should not happen).
    Lost,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Exited(0))
    }
}

/// Whether the runner currently owns an active child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerStatus {
    Idle,
    Running { run_id: RunId, label: String },
}

impl RunnerStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, RunnerStatus::Idle)
    }
}
