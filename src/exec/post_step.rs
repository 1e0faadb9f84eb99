// src/exec/post_step.rs

//! Sequential, bounded commands run after the main run (stats generation).

use std::io::{BufReader, Read};

use anyhow::Context;
use tracing::{info, warn};

use crate::errors::{BenchError, Result};
use crate::exec::pipe::{decode_line, spawn_merged, SpawnedChild};
use crate::exec::CommandSpec;
use crate::output::{Classifier, LogLine};

/// What a post-processing command printed and how it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostStepReport {
    pub command: String,
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Combined stdout/stderr, in emission order.
    pub lines: Vec<LogLine>,
}

impl PostStepReport {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// `ChildProcessFailure` unless the command exited with status 0.
    pub fn check(&self) -> Result<()> {
        if self.success() {
            Ok(())
        } else {
            Err(BenchError::ChildProcessFailure {
                command: self.command.clone(),
                code: self.code,
            })
        }
    }
}

/// Run `command` to completion and capture its merged output.
///
/// Only spawn failures are returned as `Err`; a non-zero exit is part of the
/// report (see [`PostStepReport::check`]). Never retried.
pub async fn run_post_step(command: &CommandSpec, classifier: &Classifier) -> Result<PostStepReport> {
    info!(label = %command.label, cmd = %command, "running post-processing step");

    let SpawnedChild { mut child, output } = spawn_merged(command)?;

    let reader = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        BufReader::new(output).read_to_end(&mut buf)?;
        Ok(buf)
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for {}", command.label))?;

    let bytes = reader
        .await
        .context("post-step reader task panicked")?
        .with_context(|| format!("reading output of {}", command.label))?;

    let lines = split_lines(&bytes)
        .map(|text| LogLine::classified(text, classifier))
        .collect();

    let report = PostStepReport {
        command: command.to_string(),
        code: status.code(),
        lines,
    };

    if report.success() {
        info!(label = %command.label, "post-processing step succeeded");
    } else {
        warn!(label = %command.label, code = ?report.code, "post-processing step failed");
    }

    Ok(report)
}

fn split_lines(bytes: &[u8]) -> impl Iterator<Item = String> + '_ {
    let trimmed = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let empty = bytes.is_empty();
    trimmed
        .split(|b| *b == b'\n')
        .filter(move |_| !empty)
        .map(decode_line)
}
