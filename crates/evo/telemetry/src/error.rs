/// Errors from reading telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("telemetry source unavailable: {0}")]
    Unavailable(String),
}
