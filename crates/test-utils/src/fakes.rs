use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use benchrun::errors::{BenchError, Result};
use benchrun::fs::mock::MockFileSystem;
use benchrun::output::{LogLine, OutputSink};
use benchrun::preflight::RepoCloner;
use benchrun::types::LogTag;

/// A sink that records every line it receives.
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to the code under test.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|l| l.text).collect()
    }

    pub fn tagged(&self, tag: LogTag) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.tag == tag)
            .map(|l| l.text)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.text.contains(needle))
    }
}

impl OutputSink for CollectingSink {
    fn emit(&mut self, line: &LogLine) {
        self.lines.lock().unwrap().push(line.clone());
    }
}

/// A cloner that never touches the network.
///
/// - records every `(url, dest)` it was asked for
/// - on success creates `dest`, either in a mock filesystem or on disk
/// - can be told to fail with a fixed message
#[derive(Debug, Clone, Default)]
pub struct FakeCloner {
    calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
    mock_fs: Option<MockFileSystem>,
    failure: Option<String>,
}

impl FakeCloner {
    /// Succeeds by creating the destination on the real filesystem.
    pub fn on_disk() -> Self {
        Self::default()
    }

    /// Succeeds by creating the destination in `fs`.
    pub fn on_mock(fs: MockFileSystem) -> Self {
        Self {
            mock_fs: Some(fs),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RepoCloner for FakeCloner {
    fn clone_repo<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), dest.to_path_buf()));

            if let Some(message) = &self.failure {
                return Err(BenchError::Other(anyhow::anyhow!(message.clone())));
            }

            match &self.mock_fs {
                Some(fs) => fs.add_dir(dest),
                None => std::fs::create_dir_all(dest)?,
            }
            Ok(())
        })
    }
}
