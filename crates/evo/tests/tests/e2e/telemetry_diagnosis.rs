//! End-to-end test: run logs on disk become a diagnosis.

use std::time::Duration;

use evo_telemetry::{diagnose, TelemetryReader, TelemetrySource, NO_FAILURES};
use evo_tests::{failing_run, seed_telemetry};
use evo_types::{layout, TelemetryEvent, TelemetryKind};
use tempfile::TempDir;

#[tokio::test]
async fn sessions_are_merged_and_diagnosed() {
    let dir = TempDir::new().unwrap();
    seed_telemetry(dir.path(), "cli:direct", "20260101", &failing_run()).await.unwrap();
    seed_telemetry(
        dir.path(),
        "telegram:42",
        "20260102",
        &[TelemetryEvent::tool_failure("web_fetch"), TelemetryEvent::new(TelemetryKind::InboundMsg)],
    )
    .await
    .unwrap();

    let reader = TelemetryReader::new(dir.path());
    assert_eq!(reader.list_sessions().await.unwrap(), vec!["cli_direct", "telegram_42"]);

    let events = reader.collect(500, Some(Duration::from_secs(3600))).await.unwrap();
    assert_eq!(events.len(), 6);

    let diagnosis = diagnose(&events);
    assert_eq!(diagnosis.failure_count, 5);
    assert_eq!(diagnosis.tool_failures[0].name, "shell");
    assert_eq!(diagnosis.tool_failures[1].name, "web_fetch");
    assert_eq!(diagnosis.tool_failures[1].count, 2);
    assert!(diagnosis.summary.contains("Exception clusters: \"ConnectionResetError: peer closed\"(1)"));
}

#[tokio::test]
async fn garbage_lines_are_ignored() {
    let dir = TempDir::new().unwrap();
    seed_telemetry(dir.path(), "cli:direct", "20260101", &failing_run()).await.unwrap();
    let file = layout::runs_dir(dir.path()).join("cli_direct").join("20260101.jsonl");
    let mut raw = tokio::fs::read_to_string(&file).await.unwrap();
    raw.push_str("not json at all\n{\"event_type\":\n");
    tokio::fs::write(&file, raw).await.unwrap();

    let events = TelemetryReader::new(dir.path()).collect(500, None).await.unwrap();
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn quiet_run_reports_no_failures() {
    let dir = TempDir::new().unwrap();
    seed_telemetry(
        dir.path(),
        "cli:direct",
        "20260101",
        &[TelemetryEvent::new(TelemetryKind::InboundMsg), TelemetryEvent::new(TelemetryKind::OutboundMsg)],
    )
    .await
    .unwrap();
    let events = TelemetryReader::new(dir.path()).collect(500, None).await.unwrap();
    let diagnosis = diagnose(&events);
    assert!(!diagnosis.has_failures());
    assert_eq!(diagnosis.summary, NO_FAILURES);
}
