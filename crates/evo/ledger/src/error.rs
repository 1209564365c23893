/// Errors from the audit ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
