use std::time::Duration;

/// Failures of an external tool invoked during apply.
///
/// These never escape [`crate::ApplyEngine::apply`]; the engine turns them
/// into a failed [`crate::ApplyOutcome`] naming the stage.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("{tool} command not found")]
    ToolMissing { tool: String },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("`{command}` timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    /// A commit failed and resetting the index afterwards failed too.
    #[error("{cause}; index not reset: {reset}")]
    IndexNotReset {
        cause: Box<ApplyError>,
        reset: Box<ApplyError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApplyError {
    pub fn is_tool_missing(&self) -> bool {
        match self {
            Self::ToolMissing { .. } => true,
            Self::IndexNotReset { cause, .. } => cause.is_tool_missing(),
            _ => false,
        }
    }

    /// Split off a failed index reset: the primary error plus the reset
    /// error, when there was one.
    pub fn into_parts(self) -> (ApplyError, Option<ApplyError>) {
        match self {
            Self::IndexNotReset { cause, reset } => (*cause, Some(*reset)),
            other => (other, None),
        }
    }

    /// Underlying tool output when there is one, else the display text.
    pub fn detail(&self) -> String {
        match self {
            Self::CommandFailed { stderr, .. } => stderr.clone(),
            Self::IndexNotReset { cause, .. } => cause.detail(),
            other => other.to_string(),
        }
    }
}
