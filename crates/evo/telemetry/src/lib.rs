#![deny(unsafe_code)]
//! # evo-telemetry
//!
//! Input side of the evolution loop: reads the per-session run logs an
//! external recorder leaves under `<workspace>/evo/runs/` and turns them
//! into a [`Diagnosis`].
//!
//! - [`TelemetryReader`] — bounded, corruption-tolerant reads
//! - [`TelemetrySource`] — seam the controller depends on
//! - [`diagnose`] — pure aggregation (tool failures, exception clusters)

pub mod diagnose;
pub mod error;
pub mod reader;

pub use diagnose::{diagnose, Diagnosis, NO_FAILURES};
pub use error::TelemetryError;
pub use reader::{SimulatedTelemetry, TelemetryReader, TelemetrySource};
