#![deny(unsafe_code)]
//! # evo-types
//!
//! Shared vocabulary for the Evolution Safety Core.
//!
//! ## Key Types
//!
//! - [`Proposal`] — an immutable, machine-generated candidate change
//! - [`RiskLevel`] / [`RiskThreshold`] — ordered risk classification and auto-approve bound
//! - [`LifecycleEvent`] / [`LifecycleKind`] — one row of the audit ledger
//! - [`TelemetryEvent`] / [`TelemetryKind`] — one raw agent-run record
//! - [`Tally`] — stable "most common" ranking shared by diagnosis and reports
//! - [`layout`] — on-disk locations under a workspace

pub mod error;
pub mod event;
pub mod layout;
pub mod proposal;
pub mod risk;
pub mod tally;
pub mod telemetry;

pub use error::TypesError;
pub use event::{EventId, LifecycleEvent, LifecycleKind};
pub use proposal::{Proposal, ProposalId};
pub use risk::{risk_allowed, RiskLevel, RiskThreshold};
pub use tally::{rank_most_common, Tally};
pub use telemetry::{TelemetryEvent, TelemetryKind, EXCEPTION_PREFIX_CHARS};
