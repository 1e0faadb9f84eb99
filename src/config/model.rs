// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Result;
use crate::output::Classifier;
use crate::types::LogTag;

/// Remote the data repository is cloned from when it is missing.
pub const DEFAULT_DATA_REPO_URL: &str = "https://github.com/exercism/python.git";

/// Test-path value meaning "run every exercise".
pub const ALL_TESTS: &str = "all";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [paths]
/// benchmark_script = "benchmark/benchmark.py"
/// results_root = "tmp.benchmarks"
/// credentials_file = ".env"
/// data_repo = "tmp.benchmarks/exercism-python"
///
/// [repo]
/// url = "https://github.com/exercism/python.git"
/// clone_if_missing = false
///
/// [python]
/// interpreter = "python3"
///
/// [defaults]
/// test_path = "say"
/// model = "openai/Qwen/Qwen2.5-Coder-32B-Instruct"
/// edit_format = "diff"
/// threads = 1
///
/// [rerun]
/// pattern = "*_test.py"
///
/// [runner]
/// drain_grace_ms = 2000
///
/// [env]
/// OPENAI_API_BASE = "http://localhost:8000/v1"
///
/// [[classify.rule]]
/// pattern = "^FAILED"
/// tag = "error"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub repo: RepoSection,

    #[serde(default)]
    pub python: PythonSection,

    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub rerun: RerunSection,

    #[serde(default)]
    pub runner: RunnerSection,

    /// Extra variables merged over the built-in environment overlay.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub classify: ClassifySection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub repo: RepoSection,
    pub python: PythonSection,
    pub defaults: DefaultsSection,
    pub rerun: RerunSection,
    pub runner: RunnerSection,
    pub env: BTreeMap<String, String>,
    pub classify: ClassifySection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            repo: raw.repo,
            python: raw.python,
            defaults: raw.defaults,
            rerun: raw.rerun,
            runner: raw.runner,
            env: raw.env,
            classify: raw.classify,
        }
    }

    /// Built-in classification rules plus `[[classify.rule]]` entries.
    pub fn classifier(&self) -> Result<Classifier> {
        Classifier::with_extra_patterns(
            self.classify
                .rule
                .iter()
                .map(|rule| (rule.pattern.as_str(), rule.tag)),
        )
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.runner.drain_grace_ms)
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    /// The external benchmark script.
    #[serde(default = "default_benchmark_script")]
    pub benchmark_script: PathBuf,

    /// Directory holding one subdirectory per run.
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,

    /// File holding API keys; only its presence is checked.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// Checkout of the exercise repository the benchmark runs against.
    #[serde(default = "default_data_repo")]
    pub data_repo: PathBuf,
}

fn default_benchmark_script() -> PathBuf {
    PathBuf::from("benchmark").join("benchmark.py")
}

fn default_results_root() -> PathBuf {
    PathBuf::from("tmp.benchmarks")
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_data_repo() -> PathBuf {
    default_results_root().join("exercism-python")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            benchmark_script: default_benchmark_script(),
            results_root: default_results_root(),
            credentials_file: default_credentials_file(),
            data_repo: default_data_repo(),
        }
    }
}

/// `[repo]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSection {
    #[serde(default = "default_repo_url")]
    pub url: String,

    /// Clone the data repository without asking when it is missing.
    #[serde(default)]
    pub clone_if_missing: bool,
}

fn default_repo_url() -> String {
    DEFAULT_DATA_REPO_URL.to_string()
}

impl Default for RepoSection {
    fn default() -> Self {
        Self {
            url: default_repo_url(),
            clone_if_missing: false,
        }
    }
}

/// `[python]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PythonSection {
    /// Interpreter used for the benchmark script and for test discovery.
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,
}

fn default_interpreter() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("python")
    } else {
        PathBuf::from("python3")
    }
}

impl Default for PythonSection {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
        }
    }
}

/// `[defaults]` section: values used when the CLI does not override them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    #[serde(default = "default_test_path")]
    pub test_path: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_edit_format")]
    pub edit_format: String,

    #[serde(default = "default_threads")]
    pub threads: u32,
}

fn default_test_path() -> String {
    "say".to_string()
}

fn default_model() -> String {
    "openai/Qwen/Qwen2.5-Coder-32B-Instruct".to_string()
}

fn default_edit_format() -> String {
    "diff".to_string()
}

fn default_threads() -> u32 {
    1
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            test_path: default_test_path(),
            model: default_model(),
            edit_format: default_edit_format(),
            threads: default_threads(),
        }
    }
}

/// `[rerun]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RerunSection {
    /// Glob handed to `unittest discover -p` and used to verify the chosen
    /// test directory actually contains tests.
    #[serde(default = "default_rerun_pattern")]
    pub pattern: String,
}

fn default_rerun_pattern() -> String {
    "*_test.py".to_string()
}

impl Default for RerunSection {
    fn default() -> Self {
        Self {
            pattern: default_rerun_pattern(),
        }
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSection {
    /// How long to keep draining output after the child exited.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}

fn default_drain_grace_ms() -> u64 {
    2000
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

/// `[classify]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ClassifySection {
    /// Extra rules, evaluated after the built-in ones.
    #[serde(default)]
    pub rule: Vec<ClassifyRuleConfig>,
}

/// `[[classify.rule]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifyRuleConfig {
    pub pattern: String,
    pub tag: LogTag,
}
