/// Errors from constructing shared types.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("unknown risk value: '{0}' (expected low, medium or high)")]
    UnknownRisk(String),
    #[error("unknown risk threshold: '{0}' (expected none, low, medium or high)")]
    UnknownThreshold(String),
}
