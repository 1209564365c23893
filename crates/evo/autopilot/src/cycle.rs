//! Per-cycle and per-run results.

use evo_types::RiskLevel;
use serde::{Deserialize, Serialize};

/// Why a generated proposal was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotAppliedReason {
    DryRun,
    RiskTooHigh,
    NoDiff,
    GateRejected,
}

impl NotAppliedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DryRun => "dry-run",
            Self::RiskTooHigh => "risk too high for auto-approve",
            Self::NoDiff => "no diff",
            Self::GateRejected => "gatekeeper rejected",
        }
    }
}

impl std::fmt::Display for NotAppliedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one autopilot iteration. Built once, never updated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    /// 1-based.
    pub cycle: u32,
    pub proposal_id: Option<String>,
    pub proposal_title: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub diagnosis_summary: String,
    pub gate_passed: bool,
    pub gate_reasons: Vec<String>,
    pub applied: bool,
    /// Engine message when applied, otherwise the not-applied reason.
    pub apply_result: String,
    pub not_applied: Option<NotAppliedReason>,
    /// Set when the apply outcome could not be written to the ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_error: Option<String>,
    pub duration_ms: u64,
    pub skipped: bool,
    pub skip_reason: Option<String>,
}

impl CycleResult {
    pub fn skipped(cycle: u32, reason: impl Into<String>) -> Self {
        Self {
            cycle,
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Aggregate over one `Autopilot::run`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub cycles_run: u32,
    pub cycles_skipped: u32,
    pub proposals_generated: u32,
    /// Proposals the gatekeeper rejected.
    pub proposals_gated: u32,
    pub proposals_applied: u32,
    pub proposals_failed: u32,
    pub cycle_results: Vec<CycleResult>,
    pub total_duration_ms: u64,
    /// Ended before `max_cycles`: stop-on-failure, or an apply outcome the
    /// ledger could not record.
    pub stopped_early: bool,
}

impl RunResult {
    pub(crate) fn push(&mut self, result: CycleResult) {
        self.cycles_run += 1;
        if result.skipped {
            self.cycles_skipped += 1;
        }
        self.cycle_results.push(result);
    }
}
