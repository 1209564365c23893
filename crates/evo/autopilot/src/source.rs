//! Where proposals come from.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evo_telemetry::Diagnosis;
use evo_types::{Proposal, ProposalId, RiskLevel};

use crate::error::AutopilotError;

/// Title of the diagnosis-only proposal.
pub const HEURISTIC_TITLE: &str = "heuristic-only";

/// Produces one proposal per call from a diagnosis and optional history.
#[async_trait]
pub trait ProposalSource: Send + Sync {
    async fn propose(&self, diagnosis: &Diagnosis, history: &str) -> Result<Proposal, AutopilotError>;

    fn name(&self) -> &str;
}

/// Deterministic source used when no reasoning provider is configured.
/// Its proposals summarise the diagnosis and never carry a diff.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicProposalSource;

impl HeuristicProposalSource {
    pub fn proposal_for(diagnosis: &Diagnosis) -> Proposal {
        Proposal::new(HEURISTIC_TITLE)
            .with_objective(format!("Heuristic diagnosis: {}", diagnosis.summary))
            .with_evidence(diagnosis.summary.clone())
            .with_risk(RiskLevel::Low)
    }
}

#[async_trait]
impl ProposalSource for HeuristicProposalSource {
    async fn propose(&self, diagnosis: &Diagnosis, _history: &str) -> Result<Proposal, AutopilotError> {
        Ok(Self::proposal_for(diagnosis))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

// ── Simulated ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Behaviour {
    Template(Proposal),
    Fail(String),
    Stall(Duration),
}

/// Test source: returns a template proposal under a fresh id on every call,
/// fails, or stalls. Clones share the call count.
#[derive(Clone, Debug)]
pub struct SimulatedProposalSource {
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

impl SimulatedProposalSource {
    pub fn returning(template: Proposal) -> Self {
        Self {
            behaviour: Behaviour::Template(template),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behaviour: Behaviour::Fail(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleeps for `delay` before answering with an empty proposal.
    pub fn stalling(delay: Duration) -> Self {
        Self {
            behaviour: Behaviour::Stall(delay),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProposalSource for SimulatedProposalSource {
    async fn propose(&self, _diagnosis: &Diagnosis, _history: &str) -> Result<Proposal, AutopilotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Template(template) => {
                let mut proposal = template.clone();
                proposal.id = ProposalId::new();
                Ok(proposal)
            }
            Behaviour::Fail(message) => Err(AutopilotError::Proposal(message.clone())),
            Behaviour::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Proposal::new("late"))
            }
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
