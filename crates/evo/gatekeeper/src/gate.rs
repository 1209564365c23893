//! The validation pass.

use evo_types::Proposal;
use tracing::info;

use crate::policy::{normalize_path, GatePolicy};
use crate::scan::{dangerous_calls, header_paths};
use crate::verdict::{GateVerdict, GateViolation};

/// Validate `proposal` against `policy`.
///
/// Every check runs; the verdict lists all violations in check order:
/// denylist, allowlist, size, secrets, dangerous calls. Paths checked are
/// the declared `files_touched` plus any path named in the diff's file
/// headers (including git rename and copy targets), so a diff cannot reach
/// a file it did not declare.
pub fn validate(proposal: &Proposal, policy: &GatePolicy) -> GateVerdict {
    let mut violations = Vec::new();
    let touched = touched_paths(proposal);

    // Denylist
    for path in &touched {
        let normalized = normalize_path(path);
        for entry in &policy.denylist_paths {
            if normalized.starts_with(&normalize_path(entry)) {
                violations.push(GateViolation::DeniedPath {
                    path: path.clone(),
                    entry: entry.clone(),
                });
            }
        }
    }

    // Allowlist
    if !policy.allowlist_paths.is_empty() {
        for path in &touched {
            let normalized = normalize_path(path);
            let allowed = policy
                .allowlist_paths
                .iter()
                .any(|prefix| normalized.starts_with(&normalize_path(prefix)));
            if !allowed {
                violations.push(GateViolation::NotAllowed {
                    path: path.clone(),
                    allowlist: policy.allowlist_paths.clone(),
                });
            }
        }
    }

    // Size
    let lines = proposal.diff_line_count();
    if lines > policy.max_patch_lines {
        violations.push(GateViolation::DiffTooLarge {
            lines,
            max: policy.max_patch_lines,
        });
    }

    // Secrets
    if evo_redact::contains_secrets(&proposal.unified_diff) {
        violations.push(GateViolation::SecretsDetected {
            classes: evo_redact::detect(&proposal.unified_diff),
        });
    }

    // Dangerous calls
    for pattern in dangerous_calls(&proposal.unified_diff) {
        violations.push(GateViolation::DangerousCall {
            label: pattern.label.to_string(),
            concern: pattern.concern.to_string(),
        });
    }

    let verdict = GateVerdict::from_violations(violations);
    if !verdict.accepted {
        info!(
            proposal_id = %proposal.id,
            violations = verdict.violations.len(),
            "proposal rejected by gatekeeper"
        );
    }
    verdict
}

/// Declared paths followed by undeclared diff-header paths, deduplicated.
///
/// See [`crate::scan::header_paths`] for the header forms recognised.
pub fn touched_paths(proposal: &Proposal) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    let declared = proposal.files_touched.iter().cloned();
    for path in declared.chain(header_paths(&proposal.unified_diff)) {
        let seen = paths
            .iter()
            .any(|p| normalize_path(p) == normalize_path(&path));
        if !seen {
            paths.push(path);
        }
    }
    paths
}
