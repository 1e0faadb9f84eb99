#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use benchrun::config::{ClassifyRuleConfig, ConfigFile, RawConfigFile};
use benchrun::types::LogTag;
use tempfile::TempDir;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Point every path at `root`, using the same relative layout as the
    /// defaults.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let paths = &mut self.config.paths;
        paths.benchmark_script = root.join("benchmark").join("benchmark.py");
        paths.results_root = root.join("tmp.benchmarks");
        paths.credentials_file = root.join(".env");
        paths.data_repo = root.join("tmp.benchmarks").join("exercism-python");
        self
    }

    pub fn interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.config.python.interpreter = interpreter.into();
        self
    }

    pub fn results_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.results_root = dir.into();
        self
    }

    pub fn data_repo(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.data_repo = dir.into();
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.config.defaults.model = model.to_string();
        self
    }

    pub fn threads(mut self, threads: u32) -> Self {
        self.config.defaults.threads = threads;
        self
    }

    pub fn clone_if_missing(mut self, val: bool) -> Self {
        self.config.repo.clone_if_missing = val;
        self
    }

    pub fn drain_grace_ms(mut self, ms: u64) -> Self {
        self.config.runner.drain_grace_ms = ms;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn classify_rule(mut self, pattern: &str, tag: LogTag) -> Self {
        self.config.classify.rule.push(ClassifyRuleConfig {
            pattern: pattern.to_string(),
            tag,
        });
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fake benchmark script, interpreted by `sh`.
///
/// - `sh benchmark.py --stats DIR` prints a short summary and exits 0.
/// - `sh benchmark.py RUN_NAME ...` prints a few tagged lines (one on
///   stderr), creates `RUN_NAME/model/test/sample_test.py` under
///   `$AIDER_BENCHMARK_DIR`, and exits 0.
pub const FAKE_BENCHMARK_SCRIPT: &str = r#"
if [ "$1" = "--stats" ]; then
  echo "Info: stats for $2"
  echo "pass_rate_1: 100.0"
  exit 0
fi
echo "Running: $1"
echo "Warning: using a fake model" 1>&2
mkdir -p "$AIDER_BENCHMARK_DIR/$1/model/test"
touch "$AIDER_BENCHMARK_DIR/$1/model/test/sample_test.py"
echo "Benchmark completed"
"#;

/// A temporary checkout with credentials, script and data repository in
/// place, configured to interpret the script with `sh`.
pub struct BenchWorkspace {
    pub dir: TempDir,
}

impl BenchWorkspace {
    pub fn new() -> Self {
        Self::with_script(FAKE_BENCHMARK_SCRIPT)
    }

    pub fn with_script(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        fs::write(root.join(".env"), "OPENAI_API_KEY=test\n").expect("write .env");
        fs::create_dir_all(root.join("benchmark")).expect("create benchmark dir");
        fs::write(root.join("benchmark").join("benchmark.py"), body).expect("write script");
        fs::create_dir_all(root.join("tmp.benchmarks").join("exercism-python"))
            .expect("create data repo");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn results_root(&self) -> PathBuf {
        self.root().join("tmp.benchmarks")
    }

    pub fn config_builder(&self) -> ConfigFileBuilder {
        ConfigFileBuilder::new().rooted_at(self.root()).interpreter("sh")
    }

    pub fn config(&self) -> ConfigFile {
        self.config_builder().build()
    }
}

impl Default for BenchWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
