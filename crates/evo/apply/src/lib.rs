#![deny(unsafe_code)]
//! # evo-apply
//!
//! Transactional application of a gate-approved proposal.
//!
//! The [`ApplyEngine`] re-validates the proposal, then drives a
//! [`TransactionalWorkspace`] through branch → check → apply → test →
//! commit. Any failure after branching rolls the workspace back to where it
//! started. Outcomes are values ([`ApplyOutcome`]); tool failures never
//! escape as errors.
//!
//! ## Implementations
//!
//! - [`GitWorkspace`] / [`CommandTestRunner`] — real `git` and test command
//! - [`SimulatedWorkspace`] / [`SimulatedTestRunner`] — call-recording fakes
//!
//! ## Crash recovery
//!
//! A process killed mid-apply can leave an `evo/...` branch checked out
//! with uncommitted changes. Recovery is manual: `git checkout -`, then
//! `git branch -D <branch>`.

pub mod engine;
pub mod error;
pub mod runner;
pub mod workspace;

pub use engine::{
    branch_name, commit_message, ApplyEngine, ApplyMode, ApplyOutcome, ApplySettings, ApplyStage,
    DRY_RUN_MESSAGE,
};
pub use error::ApplyError;
pub use runner::{
    CommandTestRunner, SimulatedTestRunner, TestFailure, TestReport, TestRunner,
    DEFAULT_TEST_TIMEOUT,
};
pub use workspace::{
    Checkpoint, FailMode, FailPoint, GitWorkspace, SimulatedWorkspace, TransactionalWorkspace,
    WorkspaceCall,
};
