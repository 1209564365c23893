//! Adversarial test: a misbehaving reasoning provider cannot push changes
//! through the autopilot.

use evo_apply::{ApplyEngine, SimulatedTestRunner, SimulatedWorkspace};
use evo_autopilot::{
    parse_proposal_text, Autopilot, AutopilotConfig, NotAppliedReason, ReasoningProposalSource,
    RecordingPacer, ScriptedProvider, NO_OP_TITLE,
};
use evo_gatekeeper::GatePolicy;
use evo_ledger::EventLedger;
use evo_telemetry::{diagnose, SimulatedTelemetry};
use evo_tests::failing_run;
use evo_types::LifecycleKind;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn run_with_reply(reply: ScriptedProvider) -> (TempDir, SimulatedWorkspace, evo_autopilot::RunResult) {
    let dir = TempDir::new().unwrap();
    let workspace = SimulatedWorkspace::succeeding();
    let engine = ApplyEngine::new(workspace.clone(), SimulatedTestRunner::passing(), GatePolicy::default());
    let ledger = EventLedger::open(dir.path()).await.unwrap();
    let config = AutopilotConfig {
        max_cycles: 1,
        dry_run: false,
        ..Default::default()
    };
    let run = Autopilot::new(config, SimulatedTelemetry::with_events(failing_run()), ledger, engine)
        .with_source(ReasoningProposalSource::new(reply))
        .with_pacer(RecordingPacer::new())
        .run()
        .await;
    (dir, workspace, run)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn denied_path_from_provider_is_never_applied() {
    let reply = r#"{"title":"tweak env","risk_level":"low","files_touched":[".env"],
        "unified_diff":"--- a/.env\n+++ b/.env\n@@ -1 +1 @@\n-A=1\n+A=2\n"}"#;
    let (dir, workspace, run) = run_with_reply(ScriptedProvider::replying(reply)).await;
    let cycle = &run.cycle_results[0];
    assert!(!cycle.gate_passed);
    assert_eq!(cycle.not_applied, Some(NotAppliedReason::GateRejected));
    assert!(workspace.calls().is_empty());

    let events = EventLedger::open(dir.path()).await.unwrap().read(None).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, LifecycleKind::EvolveGenerated);
}

#[tokio::test]
async fn high_risk_reply_is_not_auto_applied() {
    let reply = r#"{"title":"big refactor","risk_level":"high","files_touched":["src/a.rs"],
        "unified_diff":"--- a/src/a.rs\n+++ b/src/a.rs\n@@ -1 +1 @@\n-a\n+b\n"}"#;
    let (_dir, workspace, run) = run_with_reply(ScriptedProvider::replying(reply)).await;
    assert_eq!(run.cycle_results[0].not_applied, Some(NotAppliedReason::RiskTooHigh));
    assert!(workspace.calls().is_empty());
}

#[tokio::test]
async fn garbage_replies_degrade_to_no_op() {
    for reply in ["", "Sure! Here's a fix:", "```\nnot json\n```", "null", "[{\"title\":\"x\"}]"] {
        let (_dir, workspace, run) = run_with_reply(ScriptedProvider::replying(reply)).await;
        let cycle = &run.cycle_results[0];
        assert_eq!(cycle.proposal_title.as_deref(), Some(NO_OP_TITLE), "{reply:?}");
        assert_eq!(cycle.not_applied, Some(NotAppliedReason::NoDiff));
        assert!(workspace.calls().is_empty());
        assert_eq!(run.proposals_generated, 1);
    }
}

#[tokio::test]
async fn provider_outage_degrades_to_no_op() {
    let (_dir, _workspace, run) = run_with_reply(ScriptedProvider::failing("HTTP 503")).await;
    assert_eq!(run.cycles_skipped, 0);
    assert_eq!(run.cycle_results[0].proposal_title.as_deref(), Some(NO_OP_TITLE));
}

#[test]
fn unknown_risk_label_is_not_coerced() {
    let diagnosis = diagnose(&failing_run());
    let p = parse_proposal_text(r#"{"title":"x","risk_level":"trivial","unified_diff":"+a"}"#, &diagnosis);
    assert_eq!(p.title, NO_OP_TITLE);
    assert!(!p.has_diff());
}
