// src/request.rs

//! Benchmark run requests: run-name derivation, command line, environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::config::{ALL_TESTS, ConfigFile};
use crate::errors::{BenchError, Result};
use crate::exec::CommandSpec;

/// `strftime` format of run timestamps: sortable, second resolution, no
/// characters that are awkward in file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Variable pointing the benchmark at the results root.
pub const ENV_BENCHMARK_DIR: &str = "AIDER_BENCHMARK_DIR";
/// Variable telling the benchmark it is not inside its container.
pub const ENV_RUN_LOCALLY: &str = "AIDER_RUN_LOCALLY";

/// Format a timestamp for use in a run identifier.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local time, formatted with [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    format_timestamp(&Local::now())
}

/// Name of the test selected by `test_path`, or `None` for [`ALL_TESTS`].
///
/// This is the last path component, e.g. `exercises/practice/say` → `say`.
pub fn test_name(test_path: &str) -> Option<String> {
    if test_path == ALL_TESTS {
        return None;
    }
    let name = Path::new(test_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| test_path.to_string());
    Some(name)
}

/// Run identifier for one invocation.
///
/// `{timestamp}--{testname}-{model}-{edit_format}`, or
/// `{timestamp}--{model}-{edit_format}` when `test_path` is `all`.
pub fn derive_run_name(test_path: &str, model: &str, edit_format: &str, timestamp: &str) -> String {
    match test_name(test_path) {
        Some(test) => format!("{timestamp}--{test}-{model}-{edit_format}"),
        None => format!("{timestamp}--{model}-{edit_format}"),
    }
}

/// Variables injected into every benchmark child.
///
/// On Windows the child is also forced into UTF-8 text I/O.
pub fn base_env_overlay(results_root: &Path, windows: bool) -> BTreeMap<String, String> {
    let root = std::path::absolute(results_root).unwrap_or_else(|_| results_root.to_path_buf());

    let mut env = BTreeMap::new();
    env.insert(ENV_BENCHMARK_DIR.to_string(), root.to_string_lossy().into_owned());
    env.insert(ENV_RUN_LOCALLY.to_string(), "true".to_string());
    env.extend(utf8_overlay(windows));
    env
}

/// Variables forcing UTF-8 I/O in Python children on Windows; empty elsewhere.
pub fn utf8_overlay(windows: bool) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if windows {
        env.insert("PYTHONIOENCODING".to_string(), "utf-8".to_string());
        env.insert("PYTHONUTF8".to_string(), "1".to_string());
    }
    env
}

/// One benchmark invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    interpreter: PathBuf,
    script: PathBuf,
    run_name: String,
    model: String,
    edit_format: String,
    threads: u32,
    keywords: Option<String>,
    env: BTreeMap<String, String>,
}

impl RunRequest {
    pub fn builder() -> RunRequestBuilder {
        RunRequestBuilder::default()
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn edit_format(&self) -> &str {
        &self.edit_format
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn keywords(&self) -> Option<&str> {
        self.keywords.as_deref()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// `{interpreter} {script} {run_name} --model M --edit-format F --threads N [--keywords K]`
    pub fn to_command(&self) -> CommandSpec {
        let mut cmd = CommandSpec::new("benchmark", &self.interpreter)
            .arg(self.script.as_os_str())
            .arg(&self.run_name)
            .args(["--model", self.model.as_str()])
            .args(["--edit-format", self.edit_format.as_str()])
            .arg("--threads")
            .arg(self.threads.to_string())
            .envs(&self.env)
            .script(&self.script);
        if let Some(keywords) = &self.keywords {
            cmd = cmd.args(["--keywords", keywords.as_str()]);
        }
        cmd
    }

    /// `{interpreter} {script} --stats {results_dir}`
    pub fn stats_command(&self, results_dir: &Path) -> CommandSpec {
        stats_command(&self.interpreter, &self.script, results_dir, &self.env)
    }
}

impl From<&RunRequest> for CommandSpec {
    fn from(request: &RunRequest) -> Self {
        request.to_command()
    }
}

/// Post-run summary command for an existing results directory.
pub fn stats_command(
    interpreter: &Path,
    script: &Path,
    results_dir: &Path,
    env: &BTreeMap<String, String>,
) -> CommandSpec {
    CommandSpec::new("stats", interpreter)
        .arg(script.as_os_str())
        .arg("--stats")
        .arg(results_dir.as_os_str())
        .envs(env)
        .script(script)
}

/// Builder for [`RunRequest`].
#[derive(Debug, Clone, Default)]
pub struct RunRequestBuilder {
    interpreter: Option<PathBuf>,
    script: Option<PathBuf>,
    test_path: Option<String>,
    model: Option<String>,
    edit_format: Option<String>,
    threads: Option<u32>,
    timestamp: Option<String>,
    env: BTreeMap<String, String>,
}

impl RunRequestBuilder {
    /// Seed interpreter, script, defaults and environment from config.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut env = base_env_overlay(&cfg.paths.results_root, cfg!(windows));
        env.extend(cfg.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            interpreter: Some(cfg.python.interpreter.clone()),
            script: Some(cfg.paths.benchmark_script.clone()),
            test_path: Some(cfg.defaults.test_path.clone()),
            model: Some(cfg.defaults.model.clone()),
            edit_format: Some(cfg.defaults.edit_format.clone()),
            threads: Some(cfg.defaults.threads),
            timestamp: None,
            env,
        }
    }

    pub fn interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn test_path(mut self, test_path: impl Into<String>) -> Self {
        self.test_path = Some(test_path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn edit_format(mut self, edit_format: impl Into<String>) -> Self {
        self.edit_format = Some(edit_format.into());
        self
    }

    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Fix the timestamp instead of reading the clock at build time.
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Validate parameters and derive the run name.
    ///
    /// Empty test path or model, and zero threads, are reported as
    /// `MissingPrecondition` so they surface like the other pre-run checks.
    pub fn build(self) -> Result<RunRequest> {
        let test_path = non_empty(self.test_path, "Test path is required.")?;
        let model = non_empty(self.model, "Model is required.")?;
        let edit_format = non_empty(self.edit_format, "Edit format is required.")?;
        let threads = match self.threads {
            Some(n) if n >= 1 => n,
            _ => {
                return Err(BenchError::MissingPrecondition(
                    "Threads must be at least 1.".to_string(),
                ));
            }
        };
        let interpreter = self.interpreter.ok_or_else(|| {
            BenchError::MissingPrecondition("Python interpreter is required.".to_string())
        })?;
        let script = self.script.ok_or_else(|| {
            BenchError::MissingPrecondition("Benchmark script path is required.".to_string())
        })?;

        let timestamp = self.timestamp.unwrap_or_else(timestamp_now);
        let run_name = derive_run_name(&test_path, &model, &edit_format, &timestamp);

        Ok(RunRequest {
            interpreter,
            script,
            run_name,
            model,
            edit_format,
            threads,
            keywords: test_name(&test_path),
            env: self.env,
        })
    }
}

fn non_empty(value: Option<String>, message: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BenchError::MissingPrecondition(message.to_string())),
    }
}
