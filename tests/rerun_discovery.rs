use std::fs;
use std::path::{Path, PathBuf};

use benchrun::discovery::{find_latest_run, rerun_command};
use benchrun::errors::BenchError;
use benchrun::fs::mock::MockFileSystem;
use benchrun::fs::RealFileSystem;

const PATTERN: &str = "*_test.py";

fn root() -> PathBuf {
    PathBuf::from("results")
}

fn add_run(fs: &MockFileSystem, run: &str, created: u64) {
    fs.add_dir_created_at(root().join(run), created);
    fs.add_file(root().join(run).join("model").join("say").join("say_test.py"));
}

fn not_found_message(err: BenchError) -> String {
    match err {
        BenchError::NotFound(msg) => msg,
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn missing_or_empty_root_reports_no_benchmarks() {
    let fs = MockFileSystem::new();
    let err = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap_err();
    assert_eq!(not_found_message(err), "No previous benchmarks found");

    fs.add_dir(root());
    let err = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap_err();
    assert_eq!(not_found_message(err), "No previous benchmarks found");
}

#[test]
fn newest_run_directory_is_chosen() {
    let fs = MockFileSystem::new();
    add_run(&fs, "2024-01-02--b", 200);
    add_run(&fs, "2024-01-03--a", 100);

    let target = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap();
    assert_eq!(target.run_dir, root().join("2024-01-02--b"));
    assert_eq!(
        target.test_files,
        vec![root().join("2024-01-02--b/model/say/say_test.py")]
    );
}

#[test]
fn creation_time_ties_go_to_greatest_name() {
    let fs = MockFileSystem::new();
    add_run(&fs, "run-b", 500);
    add_run(&fs, "run-c", 500);
    add_run(&fs, "run-a", 500);

    let target = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap();
    assert_eq!(target.run_dir, root().join("run-c"));
}

#[test]
fn greatest_model_and_test_names_are_chosen() {
    let fs = MockFileSystem::new();
    let run = root().join("run");
    fs.add_file(run.join("model-b").join("zipper").join("zipper_test.py"));
    fs.add_file(run.join("model-c").join("anagram").join("anagram_test.py"));
    fs.add_file(run.join("model-c").join("say").join("say_test.py"));
    fs.add_file(run.join("model-a").join("yacht").join("yacht_test.py"));

    let target = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap();
    assert_eq!(target.model_dir, run.join("model-c"));
    assert_eq!(target.test_dir, run.join("model-c").join("say"));
}

#[test]
fn matching_files_are_found_recursively_and_sorted() {
    let fs = MockFileSystem::new();
    let test_dir = root().join("run").join("model").join("say");
    fs.add_file(test_dir.join("z_test.py"));
    fs.add_file(test_dir.join("say.py"));
    fs.add_file(test_dir.join("nested").join("a_test.py"));

    let target = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap();
    assert_eq!(
        target.test_files,
        vec![test_dir.join("nested").join("a_test.py"), test_dir.join("z_test.py")]
    );
}

#[test]
fn each_missing_level_has_its_own_message() {
    let fs = MockFileSystem::new();
    let run = root().join("run");
    fs.add_dir(&run);
    let msg = not_found_message(find_latest_run(&fs, &root(), PATTERN, &[]).unwrap_err());
    assert!(msg.starts_with("No model directories found in"), "got: {msg}");

    fs.add_dir(run.join("model"));
    let msg = not_found_message(find_latest_run(&fs, &root(), PATTERN, &[]).unwrap_err());
    assert!(msg.starts_with("No test directories found in"), "got: {msg}");

    fs.add_file(run.join("model").join("say").join("say.py"));
    let msg = not_found_message(find_latest_run(&fs, &root(), PATTERN, &[]).unwrap_err());
    assert!(msg.starts_with("No files matching '*_test.py' in"), "got: {msg}");
}

#[test]
fn files_at_run_level_are_not_runs() {
    let fs = MockFileSystem::new();
    add_run(&fs, "run", 10);
    fs.add_file(root().join("notes.txt"));

    let target = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap();
    assert_eq!(target.run_dir, root().join("run"));
}

#[test]
fn excluded_directories_are_skipped() {
    let fs = MockFileSystem::new();
    add_run(&fs, "run", 10);
    let data_repo = root().join("exercism-python");
    fs.add_dir_created_at(&data_repo, 99);
    fs.add_file(data_repo.join("exercises").join("say").join("say_test.py"));

    let target = find_latest_run(&fs, &root(), PATTERN, &[data_repo.clone()]).unwrap();
    assert_eq!(target.run_dir, root().join("run"));

    let target = find_latest_run(&fs, &root(), PATTERN, &[]).unwrap();
    assert_eq!(target.run_dir, data_repo);
}

#[test]
fn real_filesystem_layout() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("tmp.benchmarks");
    let test_dir = results.join("2024-01-01-00-00-00--say-m1-diff").join("m1").join("say");
    fs::create_dir_all(&test_dir).unwrap();
    fs::write(test_dir.join("say_test.py"), "import unittest\n").unwrap();
    fs::write(test_dir.join("say.py"), "").unwrap();

    let target = find_latest_run(&RealFileSystem, &results, PATTERN, &[]).unwrap();
    assert_eq!(target.test_dir, test_dir);
    assert_eq!(target.test_files, vec![test_dir.join("say_test.py")]);
}

#[test]
fn rerun_command_uses_unittest_discovery() {
    let cmd = rerun_command(Path::new("python3"), Path::new("results/run/m/say"), PATTERN);
    assert_eq!(cmd.label, "rerun");
    assert_eq!(
        cmd.to_string(),
        "python3 -m unittest discover -s results/run/m/say -t results/run/m/say -p *_test.py"
    );
}
