//! Read-only aggregation over ledger events and optional run telemetry.

use std::collections::BTreeMap;

use evo_types::{rank_most_common, LifecycleEvent, LifecycleKind, Tally, TelemetryEvent};
use serde::{Deserialize, Serialize};

/// Summary statistics for display or JSON export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub evolve_count: usize,
    pub apply_attempted: usize,
    pub apply_succeeded: usize,
    pub apply_failed: usize,
    /// Percentage of resolved applies that succeeded; 0 when none resolved.
    pub success_rate: f64,
    pub risk_distribution: BTreeMap<String, usize>,
    pub top_files_touched: Vec<Tally>,
    pub top_tool_failures: Vec<Tally>,
    pub top_exceptions: Vec<Tally>,
}

impl LedgerReport {
    pub fn from_events(
        events: &[LifecycleEvent],
        telemetry: Option<&[TelemetryEvent]>,
        top_n: usize,
    ) -> Self {
        let mut report = Self::default();

        for event in events {
            match event.kind {
                LifecycleKind::EvolveGenerated => report.evolve_count += 1,
                LifecycleKind::ApplyAttempted => report.apply_attempted += 1,
                LifecycleKind::ApplySucceeded => report.apply_succeeded += 1,
                LifecycleKind::ApplyFailed => report.apply_failed += 1,
            }
            *report
                .risk_distribution
                .entry(event.risk_level.to_string())
                .or_insert(0) += 1;
        }

        let resolved = report.apply_succeeded + report.apply_failed;
        if resolved > 0 {
            report.success_rate = report.apply_succeeded as f64 / resolved as f64 * 100.0;
        }

        report.top_files_touched = top(
            rank_most_common(events.iter().flat_map(|e| e.files_touched.iter().cloned())),
            top_n,
        );

        if let Some(telemetry) = telemetry {
            report.top_tool_failures = top(
                rank_most_common(telemetry.iter().filter_map(|e| e.failed_tool_name())),
                top_n,
            );
            report.top_exceptions = top(
                rank_most_common(telemetry.iter().filter_map(|e| e.exception_prefix())),
                top_n,
            );
        }

        report
    }
}

fn top(mut ranked: Vec<Tally>, n: usize) -> Vec<Tally> {
    ranked.truncate(n);
    ranked
}
