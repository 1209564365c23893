//! Raw agent-run telemetry records, as written by an external recorder.

use serde::{Deserialize, Serialize};

/// Exceptions are clustered by this many leading characters of the message.
pub const EXCEPTION_PREFIX_CHARS: usize = 80;

/// Kind of a telemetry record. Unrecognised tags load as [`TelemetryKind::Other`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    #[default]
    InboundMsg,
    ToolStart,
    ToolEnd,
    Exception,
    OutboundMsg,
    #[serde(other)]
    Other,
}

/// One line of a session log under `runs/<session>/<YYYYMMDD>.jsonl`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub session_key: String,
    #[serde(default, rename = "event_type")]
    pub kind: TelemetryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl TelemetryEvent {
    pub fn new(kind: TelemetryKind) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind,
            ..Default::default()
        }
    }

    /// A `tool_end` record explicitly marked unsuccessful.
    pub fn tool_failure(tool_name: impl Into<String>) -> Self {
        let mut event = Self::new(TelemetryKind::ToolEnd);
        event.tool_name = Some(tool_name.into());
        event.success = Some(false);
        event
    }

    pub fn exception(error: impl Into<String>) -> Self {
        let mut event = Self::new(TelemetryKind::Exception);
        event.error = Some(error.into());
        event
    }

    pub fn with_session(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = session_key.into();
        self
    }

    /// `tool_end` with `success == false`. A missing flag is not a failure.
    pub fn is_tool_failure(&self) -> bool {
        self.kind == TelemetryKind::ToolEnd && self.success == Some(false)
    }

    pub fn is_exception(&self) -> bool {
        self.kind == TelemetryKind::Exception
    }

    /// Tool name of a failed invocation, `"unknown"` when the recorder left it blank.
    pub fn failed_tool_name(&self) -> Option<&str> {
        if !self.is_tool_failure() {
            return None;
        }
        Some(match self.tool_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "unknown",
        })
    }

    /// Cluster key of an exception record: the first
    /// [`EXCEPTION_PREFIX_CHARS`] characters of its message.
    pub fn exception_prefix(&self) -> Option<String> {
        if !self.is_exception() {
            return None;
        }
        let message = match self.error.as_deref() {
            Some(err) if !err.is_empty() => err,
            _ => "unknown",
        };
        Some(message.chars().take(EXCEPTION_PREFIX_CHARS).collect())
    }
}
