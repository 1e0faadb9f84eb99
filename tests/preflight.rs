use std::path::PathBuf;

use benchrun::config::{PathsSection, RepoSection};
use benchrun::errors::BenchError;
use benchrun::fs::mock::MockFileSystem;
use benchrun::fs::FileSystem;
use benchrun::preflight::Preflight;
use benchrun::types::LogTag;
use benchrun_test_utils::fakes::{CollectingSink, FakeCloner};
use benchrun_test_utils::init_tracing;

fn paths() -> PathsSection {
    PathsSection {
        benchmark_script: PathBuf::from("benchmark/benchmark.py"),
        results_root: PathBuf::from("tmp.benchmarks"),
        credentials_file: PathBuf::from(".env"),
        data_repo: PathBuf::from("tmp.benchmarks/exercism-python"),
    }
}

fn repo() -> RepoSection {
    RepoSection {
        url: "https://example.invalid/exercism-python.git".to_string(),
        clone_if_missing: false,
    }
}

fn complete_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(".env");
    fs.add_file("benchmark/benchmark.py");
    fs.add_dir("tmp.benchmarks/exercism-python");
    fs
}

fn precondition_message(err: BenchError) -> String {
    match err {
        BenchError::MissingPrecondition(msg) => msg,
        other => panic!("expected MissingPrecondition, got {other:?}"),
    }
}

#[tokio::test]
async fn all_present_passes_without_cloning() {
    init_tracing();
    let fs = complete_fs();
    let cloner = FakeCloner::on_mock(fs.clone());
    let (paths, repo) = (paths(), repo());
    let mut sink = CollectingSink::new();

    Preflight { fs: &fs, cloner: &cloner, paths: &paths, repo: &repo }
        .check(&mut sink, false)
        .await
        .unwrap();

    assert!(cloner.calls().is_empty());
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn missing_credentials_is_reported_first() {
    init_tracing();
    let fs = MockFileSystem::new();
    let cloner = FakeCloner::on_mock(fs.clone());
    let (paths, repo) = (paths(), repo());
    let mut sink = CollectingSink::new();

    let err = Preflight { fs: &fs, cloner: &cloner, paths: &paths, repo: &repo }
        .check(&mut sink, true)
        .await
        .unwrap_err();

    assert_eq!(
        precondition_message(err),
        ".env file not found. Please create it with your API keys."
    );
    assert!(cloner.calls().is_empty());
}

#[tokio::test]
async fn missing_script_is_reported() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(".env");
    let cloner = FakeCloner::on_mock(fs.clone());
    let (paths, repo) = (paths(), repo());
    let mut sink = CollectingSink::new();

    let err = Preflight { fs: &fs, cloner: &cloner, paths: &paths, repo: &repo }
        .check(&mut sink, true)
        .await
        .unwrap_err();

    assert!(precondition_message(err).starts_with("Benchmark script not found at: benchmark/benchmark.py"));
}

#[tokio::test]
async fn missing_repo_without_permission_does_not_clone() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(".env");
    fs.add_file("benchmark/benchmark.py");
    let cloner = FakeCloner::on_mock(fs.clone());
    let (paths, repo) = (paths(), repo());
    let mut sink = CollectingSink::new();

    let err = Preflight { fs: &fs, cloner: &cloner, paths: &paths, repo: &repo }
        .check(&mut sink, false)
        .await
        .unwrap_err();

    let msg = precondition_message(err);
    assert!(msg.contains("--clone-missing"), "got: {msg}");
    assert!(cloner.calls().is_empty());
}

#[tokio::test]
async fn missing_repo_is_cloned_when_allowed() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(".env");
    fs.add_file("benchmark/benchmark.py");
    let cloner = FakeCloner::on_mock(fs.clone());
    let (paths, repo) = (paths(), repo());
    let mut sink = CollectingSink::new();

    Preflight { fs: &fs, cloner: &cloner, paths: &paths, repo: &repo }
        .check(&mut sink, true)
        .await
        .unwrap();

    assert_eq!(
        cloner.calls(),
        vec![(repo.url.clone(), PathBuf::from("tmp.benchmarks/exercism-python"))]
    );
    assert!(fs.is_dir(&paths.data_repo));
    assert_eq!(sink.tagged(LogTag::Success), vec!["Repository cloned successfully!"]);
    assert!(sink.tagged(LogTag::Info)[0].starts_with("Info: cloning"));
}

#[tokio::test]
async fn failed_clone_is_a_precondition_failure() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(".env");
    fs.add_file("benchmark/benchmark.py");
    let cloner = FakeCloner::failing("network unreachable");
    let (paths, repo) = (paths(), repo());
    let mut sink = CollectingSink::new();

    let err = Preflight { fs: &fs, cloner: &cloner, paths: &paths, repo: &repo }
        .check(&mut sink, true)
        .await
        .unwrap_err();

    let msg = precondition_message(err);
    assert!(msg.starts_with("Error cloning repository:"), "got: {msg}");
    assert!(msg.contains("network unreachable"), "got: {msg}");
    assert!(!fs.is_dir(&paths.data_repo));
    assert!(sink.tagged(LogTag::Success).is_empty());
}
