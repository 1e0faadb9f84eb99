// src/preflight.rs

//! Checks that must pass before any benchmark process is spawned.
//!
//! - the credentials file exists (its contents are not read here);
//! - the benchmark script exists;
//! - the exercise data repository exists, or is cloned when allowed.
//!
//! A failure aborts the run before anything is started.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{PathsSection, RepoSection};
use crate::errors::{BenchError, Result};
use crate::exec::{run_post_step, CommandSpec};
use crate::fs::FileSystem;
use crate::output::{Classifier, LogLine, OutputSink};
use crate::types::LogTag;

/// Trait abstracting how the data repository is fetched.
///
/// Production code uses [`GitCliCloner`]; tests provide a fake that creates
/// the directory (or fails) without touching the network.
pub trait RepoCloner: Send + Sync {
    fn clone_repo<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Clones with the `git` executable found on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCliCloner {
    classifier: Arc<Classifier>,
}

impl GitCliCloner {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self { classifier }
    }
}

impl Default for GitCliCloner {
    fn default() -> Self {
        Self::new(Arc::new(Classifier::builtin()))
    }
}

impl RepoCloner for GitCliCloner {
    fn clone_repo<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let cmd = CommandSpec::new("git clone", "git")
                .args(["clone", "--depth", "1", url])
                .arg(dest.as_os_str());
            let report = run_post_step(&cmd, &self.classifier).await?;
            for line in &report.lines {
                info!(target: "benchrun::git", "{}", line.text);
            }
            report.check()
        })
    }
}

/// Everything the checks need, borrowed from the caller.
pub struct Preflight<'a> {
    pub fs: &'a dyn FileSystem,
    pub cloner: &'a dyn RepoCloner,
    pub paths: &'a PathsSection,
    pub repo: &'a RepoSection,
}

impl Preflight<'_> {
    /// Run every check in order, stopping at the first failure.
    ///
    /// Progress messages (cloning) go to `sink`; the failure itself is
    /// returned as `MissingPrecondition` for the caller to report.
    pub async fn check(&self, sink: &mut dyn OutputSink, allow_clone: bool) -> Result<()> {
        self.check_credentials()?;
        self.check_script()?;
        self.ensure_data_repo(sink, allow_clone).await
    }

    pub fn check_credentials(&self) -> Result<()> {
        let path = &self.paths.credentials_file;
        if !self.fs.is_file(path) {
            return Err(BenchError::MissingPrecondition(format!(
                "{} file not found. Please create it with your API keys.",
                path.display()
            )));
        }
        Ok(())
    }

    pub fn check_script(&self) -> Result<()> {
        let path = &self.paths.benchmark_script;
        if !self.fs.is_file(path) {
            return Err(BenchError::MissingPrecondition(format!(
                "Benchmark script not found at: {}. Please make sure the benchmark directory is in the correct location.",
                path.display()
            )));
        }
        Ok(())
    }

    pub async fn ensure_data_repo(&self, sink: &mut dyn OutputSink, allow_clone: bool) -> Result<()> {
        let dest = &self.paths.data_repo;
        if self.fs.is_dir(dest) {
            return Ok(());
        }

        if !allow_clone {
            return Err(BenchError::MissingPrecondition(format!(
                "Data repository not found at {}. It is required to run benchmarks; \
                 pass --clone-missing or set repo.clone_if_missing = true to clone {}.",
                dest.display(),
                self.repo.url
            )));
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent)?;
        }

        sink.emit(&LogLine::new(
            format!("Info: cloning {} into {}...", self.repo.url, dest.display()),
            LogTag::Info,
        ));

        match self.cloner.clone_repo(&self.repo.url, dest).await {
            Ok(()) => {
                info!(url = %self.repo.url, dest = %dest.display(), "data repository cloned");
                sink.emit(&LogLine::new(
                    "Repository cloned successfully!",
                    LogTag::Success,
                ));
                Ok(())
            }
            Err(e) => {
                warn!(url = %self.repo.url, error = %e, "clone failed");
                Err(BenchError::MissingPrecondition(format!(
                    "Error cloning repository: {e}"
                )))
            }
        }
    }
}
