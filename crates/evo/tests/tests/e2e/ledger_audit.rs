//! End-to-end test: a live autopilot run leaves a complete, redacted
//! audit trail that survives a crash-truncated line.

use evo_apply::{ApplyEngine, FailPoint, SimulatedTestRunner, SimulatedWorkspace};
use evo_autopilot::{Autopilot, AutopilotConfig, RecordingPacer, SimulatedProposalSource};
use evo_gatekeeper::GatePolicy;
use evo_ledger::{EventLedger, LedgerReport};
use evo_telemetry::SimulatedTelemetry;
use evo_tests::{failing_run, RETRY_DIFF};
use evo_types::{layout, LifecycleKind, Proposal, RiskLevel};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn live_pilot(dir: &TempDir, workspace: SimulatedWorkspace, title: &str) -> Autopilot {
    let ledger = EventLedger::open(dir.path()).await.unwrap();
    let engine = ApplyEngine::new(workspace, SimulatedTestRunner::passing(), GatePolicy::default());
    let config = AutopilotConfig {
        max_cycles: 1,
        dry_run: false,
        ..Default::default()
    };
    let proposal = Proposal::new(title)
        .with_risk(RiskLevel::Low)
        .with_file("src/retry.rs")
        .with_diff(RETRY_DIFF);
    Autopilot::new(config, SimulatedTelemetry::with_events(failing_run()), ledger, engine)
        .with_source(SimulatedProposalSource::returning(proposal))
        .with_pacer(RecordingPacer::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_attempt_is_resolved_exactly_once() {
    let dir = TempDir::new().unwrap();
    live_pilot(&dir, SimulatedWorkspace::succeeding(), "first").await.run().await;
    live_pilot(&dir, SimulatedWorkspace::failing_at(FailPoint::Stage), "second")
        .await
        .run()
        .await;

    let ledger = EventLedger::open(dir.path()).await.unwrap();
    let events = ledger.read(None).await.unwrap();
    assert_eq!(events.len(), 6);

    for attempt in events.iter().filter(|e| e.kind == LifecycleKind::ApplyAttempted) {
        let resolutions: Vec<_> = events
            .iter()
            .filter(|e| e.kind.is_resolution())
            .filter(|e| e.parent_event_id.as_ref() == Some(&attempt.event_id))
            .collect();
        assert_eq!(resolutions.len(), 1);
    }

    let last = events.last().unwrap();
    let chain = ledger.resolve_chain(&last.event_id).await.unwrap();
    let kinds: Vec<_> = chain.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LifecycleKind::EvolveGenerated,
            LifecycleKind::ApplyAttempted,
            LifecycleKind::ApplyFailed
        ]
    );

    let report = LedgerReport::from_events(&events, Some(&failing_run()), 3);
    assert_eq!(report.apply_succeeded, 1);
    assert_eq!(report.apply_failed, 1);
    assert!((report.success_rate - 50.0).abs() < f64::EPSILON);
    assert_eq!(report.top_files_touched[0].name, "src/retry.rs");
    assert_eq!(report.top_tool_failures[0].name, "shell");
    assert_eq!(report.top_tool_failures[0].count, 2);
}

#[tokio::test]
async fn secrets_in_titles_never_reach_disk() {
    let dir = TempDir::new().unwrap();
    let title = "rotate api_key=sk-live-0123456789abcdef";
    live_pilot(&dir, SimulatedWorkspace::succeeding(), title).await.run().await;

    let raw = tokio::fs::read_to_string(layout::events_path(dir.path())).await.unwrap();
    assert!(!raw.contains("sk-live-0123456789abcdef"));
    assert!(raw.contains("[REDACTED]"));
}

#[tokio::test]
async fn truncated_tail_line_is_skipped() {
    let dir = TempDir::new().unwrap();
    live_pilot(&dir, SimulatedWorkspace::succeeding(), "ok").await.run().await;

    let path = layout::events_path(dir.path());
    let mut raw = tokio::fs::read_to_string(&path).await.unwrap();
    raw.push_str("{\"event_id\":\"half-writ");
    tokio::fs::write(&path, raw).await.unwrap();

    let ledger = EventLedger::open(dir.path()).await.unwrap();
    assert_eq!(ledger.read(None).await.unwrap().len(), 3);
}
