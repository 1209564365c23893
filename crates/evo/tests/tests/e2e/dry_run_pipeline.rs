//! End-to-end test: a dry-run autopilot over real files.
//!
//! Telemetry is read from disk, proposals land in the ledger, and the
//! workspace stays byte-for-byte unchanged.

use std::path::Path;

use evo_autopilot::{Autopilot, EvolutionConfig, NotAppliedReason, RecordingPacer, SimulatedProposalSource};
use evo_ledger::LedgerReport;
use evo_tests::{failing_run, seed_telemetry, RETRY_DIFF, RETRY_ORIGINAL};
use evo_types::{LifecycleKind, Proposal, RiskLevel};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn enabled_config(max_cycles: u32) -> EvolutionConfig {
    let mut config = EvolutionConfig {
        enabled: true,
        ..Default::default()
    };
    config.autopilot.max_cycles = max_cycles;
    config
}

fn retry_proposal() -> Proposal {
    Proposal::new("raise retry count")
        .with_objective("Reduce shell failures")
        .with_risk(RiskLevel::Low)
        .with_file("src/retry.rs")
        .with_diff(RETRY_DIFF)
}

async fn workspace_with_source(dir: &Path) {
    tokio::fs::create_dir_all(dir.join("src")).await.unwrap();
    tokio::fs::write(dir.join("src/retry.rs"), RETRY_ORIGINAL).await.unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dry_run_leaves_files_untouched() {
    let dir = TempDir::new().unwrap();
    workspace_with_source(dir.path()).await;
    seed_telemetry(dir.path(), "cli:direct", "20260101", &failing_run()).await.unwrap();
    let before = tokio::fs::read(dir.path().join("src/retry.rs")).await.unwrap();

    let pilot = Autopilot::from_config(dir.path(), &enabled_config(3))
        .await
        .unwrap()
        .with_source(SimulatedProposalSource::returning(retry_proposal()))
        .with_pacer(RecordingPacer::new());
    let run = pilot.run().await;

    assert_eq!(run.cycles_run, 3);
    assert_eq!(run.proposals_generated, 3);
    assert_eq!(run.proposals_gated, 0);
    assert_eq!(run.proposals_applied, 0);
    for cycle in &run.cycle_results {
        assert_eq!(cycle.apply_result, "dry-run");
        assert_eq!(cycle.not_applied, Some(NotAppliedReason::DryRun));
        assert!(cycle.gate_passed);
    }

    let after = tokio::fs::read(dir.path().join("src/retry.rs")).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn heuristic_source_records_one_generated_event_per_cycle() {
    let dir = TempDir::new().unwrap();
    seed_telemetry(dir.path(), "cli:direct", "20260101", &failing_run()).await.unwrap();

    let pilot = Autopilot::from_config(dir.path(), &enabled_config(2))
        .await
        .unwrap()
        .with_pacer(RecordingPacer::new());
    let run = pilot.run().await;
    assert_eq!(run.proposals_generated, 2);
    assert_eq!(run.proposals_gated, 0);
    assert!(run.cycle_results[0]
        .diagnosis_summary
        .starts_with("Top failing tools: shell(2), web_fetch(1)"));

    let events = pilot.ledger().read(None).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind == LifecycleKind::EvolveGenerated));

    let report = LedgerReport::from_events(&events, None, 5);
    assert_eq!(report.evolve_count, 2);
    assert_eq!(report.apply_attempted, 0);
}

#[tokio::test]
async fn empty_workspace_skips_without_writing_ledger() {
    let dir = TempDir::new().unwrap();
    let pilot = Autopilot::from_config(dir.path(), &enabled_config(2))
        .await
        .unwrap()
        .with_pacer(RecordingPacer::new());
    let run = pilot.run().await;
    assert_eq!(run.cycles_skipped, 2);
    assert_eq!(run.proposals_generated, 0);
    assert!(pilot.ledger().read(None).await.unwrap().is_empty());
}
