#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use benchrun::errors::BenchError;
use benchrun::exec::{spawn_runner, RunnerOptions};
use benchrun::session::{RunParams, Session};
use benchrun::types::{LogTag, RunOutcome};
use benchrun_test_utils::builders::BenchWorkspace;
use benchrun_test_utils::fakes::{CollectingSink, FakeCloner};
use benchrun_test_utils::{init_tracing, with_timeout};
use tokio::sync::watch;

const RUN_NAME: &str = "2024-01-01-00-00-00--say-m1-diff";

fn session(ws: &BenchWorkspace, stop: watch::Receiver<bool>) -> Session {
    let cfg = ws.config_builder().drain_grace_ms(200).build();
    let runner = spawn_runner(RunnerOptions {
        classifier: Arc::new(cfg.classifier().unwrap()),
        drain_grace: cfg.drain_grace(),
    });
    Session::new(cfg, runner, stop).with_cloner(Arc::new(FakeCloner::on_disk()))
}

fn params() -> RunParams {
    RunParams {
        test_path: Some("say".to_string()),
        model: Some("m1".to_string()),
        timestamp: Some("2024-01-01-00-00-00".to_string()),
        ..RunParams::default()
    }
}

#[tokio::test]
async fn benchmark_run_streams_output_then_stats() {
    init_tracing();
    let ws = BenchWorkspace::new();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    let summary = with_timeout(session.run_benchmark(&params(), &mut sink))
        .await
        .unwrap();

    let results_dir = ws.results_root().join(RUN_NAME);
    assert_eq!(summary.outcome, RunOutcome::Exited(0));
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.run_name.as_deref(), Some(RUN_NAME));
    assert_eq!(summary.results_dir.as_deref(), Some(results_dir.as_path()));

    let texts = sink.texts();
    let expected_start = vec![
        "Running benchmark...".to_string(),
        format!("Run name: {RUN_NAME}"),
        "Using model: m1".to_string(),
        "Edit format: diff".to_string(),
        "Threads: 1".to_string(),
        format!("Running: {RUN_NAME}"),
        "Warning: using a fake model".to_string(),
        "Benchmark completed".to_string(),
        "Info: generating benchmark stats...".to_string(),
        format!("Info: stats for {}", results_dir.display()),
        "pass_rate_1: 100.0".to_string(),
        format!("Benchmark completed! Results are in {}", results_dir.display()),
    ];
    assert_eq!(texts[..expected_start.len()], expected_start[..]);
    assert!(sink.tagged(LogTag::Error).is_empty());

    // The fake benchmark created a run layout that re-run discovery can find.
    let rerun = session.rerun_plan().unwrap();
    let rendered = rerun.to_string();
    assert!(rendered.contains(&format!("{RUN_NAME}/model/test")), "got: {rendered}");
}

#[tokio::test]
async fn missing_credentials_aborts_before_spawning() {
    init_tracing();
    let ws = BenchWorkspace::new();
    std::fs::remove_file(ws.root().join(".env")).unwrap();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    let err = with_timeout(session.run_benchmark(&params(), &mut sink))
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::MissingPrecondition(_)), "got {err:?}");
    let errors = sink.tagged(LogTag::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error: "));
    assert!(errors[0].contains(".env file not found"));
    assert!(!sink.contains("Running benchmark..."));
    assert!(!ws.results_root().join(RUN_NAME).exists());
}

#[tokio::test]
async fn missing_data_repo_is_cloned_when_requested() {
    init_tracing();
    let ws = BenchWorkspace::new();
    let data_repo = ws.results_root().join("exercism-python");
    std::fs::remove_dir_all(&data_repo).unwrap();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    let mut request = params();
    request.clone_missing = true;
    let summary = with_timeout(session.run_benchmark(&request, &mut sink))
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), 0);
    assert!(data_repo.is_dir());
    assert!(sink.contains("Repository cloned successfully!"));
}

#[tokio::test]
async fn failing_benchmark_skips_stats() {
    init_tracing();
    let ws = BenchWorkspace::with_script("echo \"Running: $1\"\necho 'Error: model unavailable'\nexit 1\n");
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    let summary = with_timeout(session.run_benchmark(&params(), &mut sink))
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Exited(1));
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(
        sink.tagged(LogTag::Error),
        vec![
            "Error: model unavailable".to_string(),
            "Error: benchmark exited with status 1".to_string(),
        ]
    );
    assert!(!sink.contains("generating benchmark stats"));
}

#[tokio::test]
async fn failing_stats_is_reported() {
    init_tracing();
    let ws = BenchWorkspace::with_script(
        "if [ \"$1\" = \"--stats\" ]; then echo 'no results'; exit 4; fi\necho ok\n",
    );
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    let err = with_timeout(session.run_benchmark(&params(), &mut sink))
        .await
        .unwrap_err();

    assert!(
        matches!(err, BenchError::ChildProcessFailure { code: Some(4), .. }),
        "got {err:?}"
    );
    let texts = sink.texts();
    assert!(texts.contains(&"no results".to_string()));
    let last = texts.last().unwrap();
    assert!(last.starts_with("Error: "), "got: {last}");
    assert!(last.contains("--stats"), "got: {last}");
    assert!(!sink.contains("Results are in"));
}

#[tokio::test]
async fn stop_signal_cancels_active_run() {
    init_tracing();
    let ws = BenchWorkspace::with_script("echo \"Running: $1\"\nsleep 30\necho never\n");
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();
    let observer = sink.clone();
    let params = params();

    let stopper = async {
        while !observer.contains("Running: ") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        stop_tx.send(true).unwrap();
    };

    let (result, ()) = with_timeout(async {
        tokio::join!(session.run_benchmark(&params, &mut sink), stopper)
    })
    .await;
    let summary = result.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Cancelled);
    assert_eq!(summary.exit_code(), 130);
    assert_eq!(sink.tagged(LogTag::Warning), vec!["benchmark stopped by user."]);
    assert!(!sink.contains("never"));
    assert!(!sink.contains("generating benchmark stats"));
}

#[tokio::test]
async fn stop_before_start_spawns_nothing() {
    init_tracing();
    let ws = BenchWorkspace::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    stop_tx.send(true).unwrap();
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    let summary = with_timeout(session.run_benchmark(&params(), &mut sink))
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunOutcome::Cancelled);
    assert!(!sink.contains("Running: "));
    assert!(!ws.results_root().join(RUN_NAME).exists());
    assert!(session.runner().status().await.unwrap().is_idle());
}

#[tokio::test]
async fn rerun_without_results_reports_not_found() {
    init_tracing();
    let ws = BenchWorkspace::new();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    let err = with_timeout(session.rerun_latest(&mut sink))
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::NotFound(_)), "got {err:?}");
    assert_eq!(
        sink.tagged(LogTag::Error),
        vec!["Error: Not found: No previous benchmarks found".to_string()]
    );
}

#[tokio::test]
async fn check_reports_readiness() {
    init_tracing();
    let ws = BenchWorkspace::new();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);
    let mut sink = CollectingSink::new();

    with_timeout(session.check(&mut sink, false)).await.unwrap();
    assert_eq!(sink.texts(), vec!["All preconditions satisfied; ready to run."]);
}

#[tokio::test]
async fn stats_for_existing_and_missing_runs() {
    init_tracing();
    let ws = BenchWorkspace::new();
    let run_dir = ws.results_root().join("old-run");
    std::fs::create_dir_all(&run_dir).unwrap();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mut session = session(&ws, stop_rx);

    let mut sink = CollectingSink::new();
    let summary = with_timeout(session.stats("old-run", &mut sink))
        .await
        .unwrap();
    assert_eq!(summary.exit_code(), 0);
    assert!(sink.contains(&format!("Info: stats for {}", run_dir.display())));

    let mut sink = CollectingSink::new();
    let err = with_timeout(session.stats("missing-run", &mut sink))
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::NotFound(_)), "got {err:?}");
    assert_eq!(sink.tagged(LogTag::Error).len(), 1);
}
