//! Property tests: the autopilot applies a proposal exactly when every
//! precondition holds.

use evo_apply::{ApplyEngine, SimulatedTestRunner, SimulatedWorkspace};
use evo_autopilot::{Autopilot, AutopilotConfig, NotAppliedReason, RecordingPacer, SimulatedProposalSource};
use evo_gatekeeper::GatePolicy;
use evo_ledger::EventLedger;
use evo_telemetry::SimulatedTelemetry;
use evo_tests::{failing_run, RETRY_DIFF};
use evo_types::{LifecycleKind, Proposal, RiskLevel, RiskThreshold};
use proptest::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn arb_risk() -> impl Strategy<Value = RiskLevel> {
    prop_oneof![Just(RiskLevel::Low), Just(RiskLevel::Medium), Just(RiskLevel::High)]
}

fn arb_threshold() -> impl Strategy<Value = RiskThreshold> {
    prop_oneof![
        Just(RiskThreshold::None),
        Just(RiskThreshold::Low),
        Just(RiskThreshold::Medium),
        Just(RiskThreshold::High),
    ]
}

#[derive(Debug)]
struct Observed {
    applied: bool,
    reason: Option<NotAppliedReason>,
    kinds: Vec<LifecycleKind>,
    mutated: bool,
}

fn observe(dry_run: bool, threshold: RiskThreshold, risk: RiskLevel, has_diff: bool, denied: bool) -> Observed {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let dir = TempDir::new().unwrap();
        let workspace = SimulatedWorkspace::succeeding();
        let engine = ApplyEngine::new(workspace.clone(), SimulatedTestRunner::passing(), GatePolicy::default());
        let ledger = EventLedger::open(dir.path()).await.unwrap();

        let mut proposal = Proposal::new("prop").with_risk(risk);
        if has_diff {
            proposal = proposal.with_file("src/retry.rs").with_diff(RETRY_DIFF);
        }
        if denied {
            proposal = proposal.with_file(".env");
        }
        let config = AutopilotConfig {
            max_cycles: 1,
            dry_run,
            auto_approve_risk: threshold,
            ..Default::default()
        };
        let pilot = Autopilot::new(config, SimulatedTelemetry::with_events(failing_run()), ledger, engine)
            .with_source(SimulatedProposalSource::returning(proposal))
            .with_pacer(RecordingPacer::new());
        let run = pilot.run().await;
        let cycle = &run.cycle_results[0];
        let kinds = pilot.ledger().read(None).await.unwrap().into_iter().map(|e| e.kind).collect();
        Observed {
            applied: cycle.applied,
            reason: cycle.not_applied,
            kinds,
            mutated: workspace.calls().iter().any(|c| c.is_mutation()),
        }
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn applies_iff_all_preconditions_hold(
        dry_run in any::<bool>(),
        threshold in arb_threshold(),
        risk in arb_risk(),
        has_diff in any::<bool>(),
        denied in any::<bool>(),
    ) {
        let gate_passes = !(has_diff && denied);
        let expected = !dry_run && threshold.permits(risk) && has_diff && gate_passes;
        let observed = observe(dry_run, threshold, risk, has_diff, denied);

        prop_assert_eq!(observed.applied, expected);
        prop_assert_eq!(observed.reason.is_none(), expected);
        prop_assert_eq!(observed.mutated, expected);
        if expected {
            prop_assert_eq!(
                observed.kinds,
                vec![LifecycleKind::EvolveGenerated, LifecycleKind::ApplyAttempted, LifecycleKind::ApplySucceeded]
            );
        } else {
            prop_assert_eq!(observed.kinds, vec![LifecycleKind::EvolveGenerated]);
        }
        if dry_run {
            prop_assert_eq!(observed.reason, Some(NotAppliedReason::DryRun));
        }
    }
}
