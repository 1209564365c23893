//! Gate outcome: accepted, or every violated rule.

use evo_redact::SecretClass;
use serde::{Deserialize, Serialize};

/// One violated rule. `Display` gives the human-readable reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GateViolation {
    DeniedPath { path: String, entry: String },
    NotAllowed { path: String, allowlist: Vec<String> },
    DiffTooLarge { lines: usize, max: usize },
    SecretsDetected { classes: Vec<SecretClass> },
    DangerousCall { label: String, concern: String },
}

impl std::fmt::Display for GateViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeniedPath { path, entry } => {
                write!(f, "File '{path}' matches denylist entry '{entry}'")
            }
            Self::NotAllowed { path, allowlist } => {
                write!(f, "File '{path}' not in allowlist ({})", allowlist.join(", "))
            }
            Self::DiffTooLarge { lines, max } => {
                write!(f, "Diff has {lines} lines, exceeds max_patch_lines={max}")
            }
            Self::SecretsDetected { classes } => {
                let names: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
                write!(
                    f,
                    "Diff appears to contain secrets (redaction triggered: {})",
                    names.join(", ")
                )
            }
            Self::DangerousCall { label, concern } => {
                write!(f, "Diff adds {label}: review for {concern}")
            }
        }
    }
}

/// Result of [`crate::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub accepted: bool,
    pub violations: Vec<GateViolation>,
}

impl GateVerdict {
    pub fn from_violations(violations: Vec<GateViolation>) -> Self {
        Self {
            accepted: violations.is_empty(),
            violations,
        }
    }

    /// Verdict for a proposal with nothing to validate.
    pub fn pass() -> Self {
        Self::from_violations(Vec::new())
    }

    /// Reasons as display strings, in check order.
    pub fn reasons(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }
}
