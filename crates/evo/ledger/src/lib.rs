#![deny(unsafe_code)]
//! # evo-ledger
//!
//! Append-only audit trail for the evolution pipeline.
//!
//! Every lifecycle transition (`evolve_generated`, `apply_attempted`,
//! `apply_succeeded`, `apply_failed`) becomes one redacted JSON line in
//! `<workspace>/evo/events/events.jsonl`. Rows are never rewritten or
//! removed; readers skip lines they cannot parse.
//!
//! ## Constraints
//!
//! - One writer per workspace. No locking is performed.
//! - A crash mid-write leaves at most one truncated line, which readers skip.

pub mod error;
pub mod ledger;
pub mod report;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{chain_of, EventLedger};
pub use report::LedgerReport;
