//! Evolution proposals — candidate changes with a unified-diff body.

use serde::{Deserialize, Serialize};

use crate::risk::RiskLevel;

// ── Identifier ──────────────────────────────────────────────────────────

/// Unique identifier for a proposal. Opaque; generated ids are UUIDv4.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl ProposalId {
    /// Generate a new unique proposal ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ProposalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Proposal ────────────────────────────────────────────────────────────

/// A candidate change produced by a proposal source.
///
/// Consumers only ever borrow a proposal; a corrected proposal is a new
/// value built with a fresh id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(default)]
    pub id: ProposalId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub files_touched: Vec<String>,
    #[serde(default)]
    pub unified_diff: String,
    #[serde(default)]
    pub tests_to_run: Vec<String>,
    #[serde(default)]
    pub rollback_plan: String,
}

impl Proposal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ProposalId::new(),
            title: title.into(),
            objective: String::new(),
            evidence: Vec::new(),
            risk_level: RiskLevel::Low,
            files_touched: Vec::new(),
            unified_diff: String::new(),
            tests_to_run: Vec::new(),
            rollback_plan: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = ProposalId(id.into());
        self
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = objective.into();
        self
    }

    pub fn with_evidence(mut self, line: impl Into<String>) -> Self {
        self.evidence.push(line.into());
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = risk;
        self
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files_touched.push(path.into());
        self
    }

    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.unified_diff = diff.into();
        self
    }

    pub fn with_test(mut self, invocation: impl Into<String>) -> Self {
        self.tests_to_run.push(invocation.into());
        self
    }

    pub fn with_rollback_plan(mut self, plan: impl Into<String>) -> Self {
        self.rollback_plan = plan.into();
        self
    }

    /// Number of lines in the diff body.
    pub fn diff_line_count(&self) -> usize {
        self.unified_diff.lines().count()
    }

    /// Whether the diff has any non-whitespace content.
    pub fn has_diff(&self) -> bool {
        !self.unified_diff.trim().is_empty()
    }
}
