// src/discovery.rs

//! "Re-run latest": locate the test directory of the most recent run.
//!
//! Layout under the results root:
//!
//! ```text
//! <results_root>/<run_name>/<model_dir>/<test_dir>/*_test.py
//! ```
//!
//! Choice at each level is deterministic:
//! - run level: newest creation time, ties broken by the greatest name;
//! - model and test levels: lexicographically greatest name.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::{debug, info};

use crate::errors::{BenchError, Result};
use crate::exec::CommandSpec;
use crate::fs::FileSystem;

/// Directories chosen for a re-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerunTarget {
    pub run_dir: PathBuf,
    pub model_dir: PathBuf,
    pub test_dir: PathBuf,
    /// Files under `test_dir` matching the discovery pattern.
    pub test_files: Vec<PathBuf>,
}

/// Find the test directory of the latest run under `results_root`.
///
/// Directories listed in `exclude` (e.g. a data checkout living inside the
/// results root) are never considered runs.
pub fn find_latest_run(
    fs: &dyn FileSystem,
    results_root: &Path,
    pattern: &str,
    exclude: &[PathBuf],
) -> Result<RerunTarget> {
    if !fs.is_dir(results_root) {
        return Err(BenchError::NotFound("No previous benchmarks found".to_string()));
    }

    let runs: Vec<PathBuf> = subdirs(fs, results_root)?
        .into_iter()
        .filter(|dir| !exclude.iter().any(|ex| same_dir(ex, dir)))
        .collect();
    let run_dir = newest(fs, runs)?
        .ok_or_else(|| BenchError::NotFound("No previous benchmarks found".to_string()))?;
    debug!(run_dir = %run_dir.display(), "latest run directory");

    let model_dir = greatest(subdirs(fs, &run_dir)?).ok_or_else(|| {
        BenchError::NotFound(format!("No model directories found in {}", run_dir.display()))
    })?;

    let test_dir = greatest(subdirs(fs, &model_dir)?).ok_or_else(|| {
        BenchError::NotFound(format!("No test directories found in {}", model_dir.display()))
    })?;

    let matcher = compile_pattern(pattern)?;
    let mut test_files = Vec::new();
    collect_matching(fs, &test_dir, &matcher, &mut test_files)?;
    if test_files.is_empty() {
        return Err(BenchError::NotFound(format!(
            "No files matching '{}' in {}",
            pattern,
            test_dir.display()
        )));
    }
    test_files.sort();

    info!(
        test_dir = %test_dir.display(),
        files = test_files.len(),
        "re-run target located"
    );

    Ok(RerunTarget {
        run_dir,
        model_dir,
        test_dir,
        test_files,
    })
}

/// `{interpreter} -m unittest discover -s T -t T -p {pattern}`
pub fn rerun_command(interpreter: &Path, test_dir: &Path, pattern: &str) -> CommandSpec {
    CommandSpec::new("rerun", interpreter)
        .args(["-m", "unittest", "discover"])
        .arg("-s")
        .arg(test_dir.as_os_str())
        .arg("-t")
        .arg(test_dir.as_os_str())
        .arg("-p")
        .arg(pattern)
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| BenchError::ConfigError(format!("invalid test pattern '{pattern}': {e}")))
}

fn subdirs(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn same_dir(a: &Path, b: &Path) -> bool {
    let strip = |p: &Path| p.strip_prefix(".").map(Path::to_path_buf).unwrap_or_else(|_| p.to_path_buf());
    strip(a) == strip(b)
}

fn newest(fs: &dyn FileSystem, dirs: Vec<PathBuf>) -> Result<Option<PathBuf>> {
    let mut best: Option<(std::time::SystemTime, String, PathBuf)> = None;
    for dir in dirs {
        let created = fs.created(&dir)?;
        let name = file_name(&dir);
        let replace = match &best {
            None => true,
            Some((t, n, _)) => (created, &name) > (*t, n),
        };
        if replace {
            best = Some((created, name, dir));
        }
    }
    Ok(best.map(|(_, _, dir)| dir))
}

fn greatest(dirs: Vec<PathBuf>) -> Option<PathBuf> {
    dirs.into_iter().max_by_key(|p| file_name(p))
}

fn collect_matching(
    fs: &dyn FileSystem,
    dir: &Path,
    matcher: &GlobMatcher,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in fs.read_dir(dir)? {
        if fs.is_dir(&entry) {
            collect_matching(fs, &entry, matcher, out)?;
        } else if fs.is_file(&entry) && matcher.is_match(file_name(&entry)) {
            out.push(entry);
        }
    }
    Ok(())
}
