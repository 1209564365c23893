#![deny(unsafe_code)]
//! # evo-autopilot
//!
//! The control loop of the evolution pipeline. An [`Autopilot`] runs a
//! bounded number of cycles, each one:
//!
//! 1. collects recent telemetry and diagnoses failures
//! 2. asks a [`ProposalSource`] for a proposal
//! 3. records `evolve_generated` in the ledger
//! 4. gates the proposal's diff
//! 5. applies it only when live, low enough risk, non-empty and gate-approved
//!
//! Cycles never run concurrently. Errors inside a cycle turn it into a
//! skipped cycle; [`Autopilot::run`] always returns a [`RunResult`].
//!
//! ## Sources
//!
//! - [`HeuristicProposalSource`] — diagnosis-only, never carries a diff
//! - [`ReasoningProposalSource`] — wraps a [`ReasoningProvider`]
//! - [`SimulatedProposalSource`] — scripted, for tests

pub mod config;
pub mod controller;
pub mod cycle;
pub mod doctor;
pub mod error;
pub mod pacer;
pub mod reasoning;
pub mod source;

pub use config::{AutopilotConfig, EvolutionConfig};
pub use controller::{Autopilot, NOTHING_TO_DIAGNOSE};
pub use cycle::{CycleResult, NotAppliedReason, RunResult};
pub use doctor::{next_steps, run_checks, worst, DoctorCheck, Severity};
pub use error::AutopilotError;
pub use pacer::{Pacer, RecordingPacer, TokioPacer};
pub use reasoning::{
    fallback_proposal, parse_proposal_text, ReasoningProposalSource, ReasoningProvider,
    ScriptedProvider, NO_OP_TITLE, SYSTEM_PROMPT,
};
pub use source::{HeuristicProposalSource, ProposalSource, SimulatedProposalSource, HEURISTIC_TITLE};
