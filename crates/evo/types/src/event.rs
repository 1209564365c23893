//! Lifecycle events — the rows of the audit ledger.
//!
//! Events form a causal chain through `parent_event_id`:
//! `evolve_generated → apply_attempted → apply_succeeded | apply_failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::proposal::{Proposal, ProposalId};
use crate::risk::RiskLevel;

// ── Identifier ──────────────────────────────────────────────────────────

/// Unique identifier for a ledger event (hyphenated UUIDv4, so the
/// redactor never mistakes it for a hex secret).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Kind ────────────────────────────────────────────────────────────────

/// Closed set of lifecycle stages recorded in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    EvolveGenerated,
    ApplyAttempted,
    ApplySucceeded,
    ApplyFailed,
}

impl LifecycleKind {
    pub const ALL: [LifecycleKind; 4] = [
        LifecycleKind::EvolveGenerated,
        LifecycleKind::ApplyAttempted,
        LifecycleKind::ApplySucceeded,
        LifecycleKind::ApplyFailed,
    ];

    /// Whether this kind resolves an `apply_attempted` event.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::ApplySucceeded | Self::ApplyFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvolveGenerated => "evolve_generated",
            Self::ApplyAttempted => "apply_attempted",
            Self::ApplySucceeded => "apply_succeeded",
            Self::ApplyFailed => "apply_failed",
        }
    }
}

impl std::fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Event ───────────────────────────────────────────────────────────────

/// One immutable ledger row.
///
/// `timestamp` is kept as the RFC 3339 text that was written so that rows
/// with a damaged timestamp still load; see [`LifecycleEvent::parsed_timestamp`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: EventId,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "event_type")]
    pub kind: LifecycleKind,
    pub proposal_id: ProposalId,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub files_touched: Vec<String>,
    #[serde(default)]
    pub diff_lines: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<EventId>,
    #[serde(default)]
    pub result: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
}

impl LifecycleEvent {
    fn for_proposal(kind: LifecycleKind, proposal: &Proposal) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Utc::now().to_rfc3339(),
            kind,
            proposal_id: proposal.id.clone(),
            risk_level: proposal.risk_level,
            files_touched: proposal.files_touched.clone(),
            diff_lines: proposal.diff_line_count(),
            parent_event_id: None,
            result: String::new(),
            title: proposal.title.clone(),
        }
    }

    /// `evolve_generated`: a proposal was produced. Chain root.
    pub fn generated(proposal: &Proposal) -> Self {
        let mut event = Self::for_proposal(LifecycleKind::EvolveGenerated, proposal);
        event.result = "ok".into();
        event
    }

    /// `apply_attempted`, caused by `parent` (usually the generated event).
    pub fn attempted(proposal: &Proposal, parent: &EventId) -> Self {
        Self::for_proposal(LifecycleKind::ApplyAttempted, proposal).with_parent(parent.clone())
    }

    /// `apply_succeeded` / `apply_failed`, resolving the attempt `parent`.
    pub fn resolved(
        proposal: &Proposal,
        parent: &EventId,
        success: bool,
        result: impl Into<String>,
    ) -> Self {
        let kind = if success {
            LifecycleKind::ApplySucceeded
        } else {
            LifecycleKind::ApplyFailed
        };
        let mut event = Self::for_proposal(kind, proposal).with_parent(parent.clone());
        event.result = result.into();
        event
    }

    pub fn with_parent(mut self, parent: EventId) -> Self {
        self.parent_event_id = Some(parent);
        self
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at.to_rfc3339();
        self
    }

    /// Timestamp as UTC, or `None` when the stored text does not parse.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}
