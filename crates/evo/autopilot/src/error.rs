use std::time::Duration;

use evo_ledger::LedgerError;
use evo_telemetry::TelemetryError;

/// Errors inside one autopilot cycle. The controller catches every one of
/// these at the cycle boundary.
#[derive(Debug, thiserror::Error)]
pub enum AutopilotError {
    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("proposal source failed: {0}")]
    Proposal(String),

    #[error("proposal source timed out after {}s", .0.as_secs())]
    ProposalTimeout(Duration),

    #[error("reasoning provider error: {0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
