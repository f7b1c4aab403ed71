//! Full runs through the coordinator.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use tirunner::log::{CapturedLines, LogLevel};
use tirunner::orchestration::{Coordinator, RunArgs};
use tirunner::{Error, Logger};

use crate::fixtures::{StubClient, StubConnector, Workspace, SAMPLE_TASKS, SERVER_NAME};

fn coordinator(connector: Arc<StubConnector>) -> (Coordinator, CapturedLines) {
    let (logger, captured) = Logger::new("tirunner").with_capture(LogLevel::Debug);
    (Coordinator::new(connector, logger), captured)
}

fn sample_run(ws: &Workspace, mode: &str) -> RunArgs {
    RunArgs::new(ws.write_tasks(SAMPLE_TASKS)).with_config(ws.write_config(mode), "tm1srv01")
}

#[tokio::test]
async fn test_three_row_scenario() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(
        StubClient::new().failing("Cleanup", "not found"),
    ));
    let (coordinator, captured) = coordinator(connector.clone());

    let summary = coordinator
        .run(&sample_run(&ws, "shared").with_max_concurrency("2"))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.client.calls(), 3);
    assert_eq!(connector.client.closes(), 1);

    assert!(captured.contains("Reading file"));
    assert!(captured.contains("3 lines read"));
    assert!(captured.contains("Maximum Parallel Threads: 2"));
    assert!(captured.contains(&format!("Connecting to: {}", SERVER_NAME)));
    assert!(captured.contains(
        "ERROR - Row 3 Cleanup: Produced Errors for [] on Planning Sample | HTTP 404: not found"
    ));
    assert!(captured.contains(
        "INFO - Row 1 LoadData: Process Completed Successfully for [Region=East] on Planning Sample"
    ));
    assert!(captured.contains("Logging Out"));
    assert!(captured.contains("Total Time To Complete 3 Processes"));
    assert!(captured.contains("Run complete: 3 tasks, 2 succeeded, 1 failed"));
}

#[tokio::test]
async fn test_missing_file_argument_never_connects() {
    let connector = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator, _) = coordinator(connector.clone());

    let err = coordinator.run(&RunArgs::default()).await.unwrap_err();

    assert!(matches!(err, Error::NoFileSpecified));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_nonexistent_file_never_connects() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator, _) = coordinator(connector.clone());

    let args = RunArgs::new(ws.dir.path().join("missing.csv"))
        .with_config(ws.write_config("shared"), "tm1srv01");
    let err = coordinator.run(&args).await.unwrap_err();

    assert!(matches!(err, Error::FileNotFound(_)));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_omitted_concurrency_defaults_to_five() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator, captured) = coordinator(connector.clone());

    let summary = coordinator.run(&sample_run(&ws, "shared")).await.unwrap();

    assert_eq!(summary.total, 3);
    assert!(captured.contains("WARNING - Max Parallel Threads Not Specified, Default: 5"));
    assert!(captured.contains("Maximum Parallel Threads: 5"));
}

#[tokio::test]
async fn test_omitted_concurrency_matches_explicit_five() {
    let ws = Workspace::new();

    let defaulted = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator_a, _) = coordinator(defaulted.clone());
    let a = coordinator_a.run(&sample_run(&ws, "per_worker")).await.unwrap();

    let explicit = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator_b, captured) = coordinator(explicit.clone());
    let b = coordinator_b
        .run(&sample_run(&ws, "per_worker").with_max_concurrency("5"))
        .await
        .unwrap();

    assert_eq!((a.total, a.succeeded, a.failed), (b.total, b.succeeded, b.failed));
    assert_eq!(defaulted.connects(), explicit.connects());
    assert!(!captured.contains("WARNING"));
}

#[tokio::test]
async fn test_non_positive_concurrency_is_fatal() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator, _) = coordinator(connector.clone());

    let err = coordinator
        .run(&sample_run(&ws, "shared").with_max_concurrency("0"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidConcurrency(0)));
    assert_eq!(connector.connects(), 0);
    assert_eq!(connector.client.calls(), 0);
}

#[tokio::test]
async fn test_malformed_row_fails_load_before_connecting() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator, _) = coordinator(connector.clone());

    let args = RunArgs::new(ws.write_tasks("LoadData,Region,East\nLoadData,Region\n"))
        .with_config(ws.write_config("shared"), "tm1srv01");
    let err = coordinator.run(&args).await.unwrap_err();

    assert!(matches!(err, Error::MalformedRow { row: 2, .. }));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_missing_config_is_configuration_error() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator, _) = coordinator(connector.clone());

    let args = RunArgs::new(ws.write_tasks(SAMPLE_TASKS))
        .with_config(ws.dir.path().join("absent.toml"), "tm1srv01");
    let err = coordinator.run(&args).await.unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_connection_failure_runs_nothing() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::unreachable());
    let (coordinator, _) = coordinator(connector.clone());

    let err = coordinator.run(&sample_run(&ws, "shared")).await.unwrap_err();

    match err {
        Error::Configuration(msg) => assert!(msg.contains("connection refused"), "{}", msg),
        other => panic!("Expected Configuration, got {:?}", other),
    }
    assert_eq!(connector.client.calls(), 0);
}

#[tokio::test]
async fn test_per_worker_sessions_all_closed() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(StubClient::new()));
    let (coordinator, _) = coordinator(connector.clone());

    let summary = coordinator
        .run(&sample_run(&ws, "per_worker").with_max_concurrency("2"))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.client.closes(), 2);
}

#[tokio::test]
async fn test_per_worker_partial_connect_closes_opened_sessions() {
    let ws = Workspace::new();
    let connector = Arc::new(StubConnector::new(StubClient::new()).failing_after(1));
    let (coordinator, _) = coordinator(connector.clone());

    let err = coordinator
        .run(&sample_run(&ws, "per_worker").with_max_concurrency("3"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.client.closes(), 1);
    assert_eq!(connector.client.calls(), 0);
}

#[test]
fn test_binary_without_file_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_tirunner")))
        .current_dir(dir.path())
        .output()
        .expect("Failed to run tirunner");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FATAL - No file specified"), "{}", stderr);
    let log = std::fs::read_to_string(dir.path().join("tirunner.log")).unwrap();
    assert!(log.contains("FATAL - No file specified"));
}

#[test]
fn test_binary_with_missing_file_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_tirunner")))
        .current_dir(dir.path())
        .arg("nope.csv")
        .output()
        .expect("Failed to run tirunner");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File not found: nope.csv"), "{}", stderr);
}
