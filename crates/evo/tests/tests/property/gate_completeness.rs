//! Property tests: the gate reports every violation and accepts only
//! proposals with none.

use evo_gatekeeper::{validate, GatePolicy, GateViolation};
use evo_types::Proposal;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn arb_path() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("src/"), Just("tests/"), Just("docs/"), Just("secrets/"), Just(".git/"), Just("")],
        "[a-z]{1,8}\\.(rs|md|toml)",
    )
        .prop_map(|(dir, file)| format!("{dir}{file}"))
}

fn is_denied(path: &str) -> bool {
    path.starts_with("secrets/") || path.starts_with(".git/")
}

fn is_allowed(path: &str) -> bool {
    path.starts_with("src/") || path.starts_with("tests/")
}

fn policy(max_patch_lines: usize) -> GatePolicy {
    GatePolicy::default()
        .with_allow("src/")
        .with_allow("tests/")
        .with_max_patch_lines(max_patch_lines)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn one_violation_per_offending_path(
        paths in prop::collection::hash_set(arb_path(), 1..8),
        body_lines in 0usize..40,
        max in 1usize..60,
    ) {
        let mut proposal = Proposal::new("prop").with_diff("+line\n".repeat(body_lines));
        for path in &paths {
            proposal = proposal.with_file(path.clone());
        }
        let verdict = validate(&proposal, &policy(max));

        let denied = verdict.violations.iter().filter(|v| matches!(v, GateViolation::DeniedPath { .. })).count();
        let not_allowed = verdict.violations.iter().filter(|v| matches!(v, GateViolation::NotAllowed { .. })).count();
        let too_large = verdict.violations.iter().any(|v| matches!(v, GateViolation::DiffTooLarge { .. }));

        prop_assert_eq!(denied, paths.iter().filter(|p| is_denied(p)).count());
        prop_assert_eq!(not_allowed, paths.iter().filter(|p| !is_allowed(p)).count());
        prop_assert_eq!(too_large, body_lines > max);
        prop_assert_eq!(verdict.accepted, verdict.violations.is_empty());
        prop_assert_eq!(verdict.reasons().len(), verdict.violations.len());
    }

    #[test]
    fn clean_allowlisted_proposals_pass(path in "src/[a-z]{1,10}\\.rs", n in 0usize..20) {
        let body = "+let x = 1;\n".repeat(n);
        let diff = format!("--- a/{path}\n+++ b/{path}\n{body}");
        let proposal = Proposal::new("clean").with_file(path).with_diff(diff);
        prop_assert!(validate(&proposal, &policy(500)).accepted);
    }
}
