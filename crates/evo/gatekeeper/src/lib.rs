#![deny(unsafe_code)]
//! # evo-gatekeeper
//!
//! Decides whether a machine-generated proposal may proceed to apply.
//!
//! The gate is a conjunction of independent syntactic checks: path
//! deny/allow prefixes, a diff-size limit, a secret scan (any change made by
//! the redactor means rejection), and a scan of added lines for command
//! execution or dynamic evaluation. No check short-circuits another; a
//! rejected [`GateVerdict`] carries every violated rule.
//!
//! Rejection is a value, not an error.

pub mod gate;
pub mod policy;
pub mod scan;
pub mod verdict;

pub use gate::{touched_paths, validate};
pub use policy::{normalize_path, GatePolicy, DEFAULT_DENYLIST, DEFAULT_MAX_PATCH_LINES};
pub use scan::{Concern, DangerousPattern, DANGEROUS_PATTERNS};
pub use verdict::{GateVerdict, GateViolation};
