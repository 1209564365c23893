//! Failure diagnosis over raw telemetry.

use evo_types::{rank_most_common, Tally, TelemetryEvent};
use serde::{Deserialize, Serialize};

/// Summary text when nothing failed.
pub const NO_FAILURES: &str = "No failures detected.";

/// Entries shown per group in the summary line.
const SUMMARY_TOP: usize = 5;

/// Aggregated failures, ready for a proposal source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub failure_count: usize,
    /// Failed tool invocations by tool name, most common first.
    pub tool_failures: Vec<Tally>,
    /// Exceptions by message prefix, most common first.
    pub exception_clusters: Vec<Tally>,
    pub summary: String,
}

impl Diagnosis {
    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }
}

/// Aggregate `events` into a [`Diagnosis`].
///
/// Pure. Ties in either grouping keep first-seen order.
pub fn diagnose(events: &[TelemetryEvent]) -> Diagnosis {
    let tools: Vec<&str> = events.iter().filter_map(|e| e.failed_tool_name()).collect();
    let prefixes: Vec<String> = events.iter().filter_map(|e| e.exception_prefix()).collect();

    let failure_count = tools.len() + prefixes.len();
    let tool_failures = rank_most_common(tools);
    let exception_clusters = rank_most_common(prefixes);

    let mut parts = Vec::new();
    if !tool_failures.is_empty() {
        let top: Vec<String> = tool_failures
            .iter()
            .take(SUMMARY_TOP)
            .map(|t| format!("{}({})", t.name, t.count))
            .collect();
        parts.push(format!("Top failing tools: {}", top.join(", ")));
    }
    if !exception_clusters.is_empty() {
        let top: Vec<String> = exception_clusters
            .iter()
            .take(SUMMARY_TOP)
            .map(|t| format!("\"{}\"({})", t.name, t.count))
            .collect();
        parts.push(format!("Exception clusters: {}", top.join(", ")));
    }

    let summary = if parts.is_empty() {
        NO_FAILURES.to_string()
    } else {
        parts.join("; ")
    };

    Diagnosis {
        failure_count,
        tool_failures,
        exception_clusters,
        summary,
    }
}
