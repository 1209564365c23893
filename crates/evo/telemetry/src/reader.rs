//! Session logs under `<workspace>/evo/runs/<session>/<YYYYMMDD>.jsonl`.
//!
//! Written by an external recorder; this module never writes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use evo_types::{layout, TelemetryEvent};
use tracing::debug;

use crate::error::TelemetryError;

/// Anything that can hand the controller a batch of recent telemetry.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// At most `max_events` records, newest last, optionally limited to the
    /// last `since`.
    async fn collect(
        &self,
        max_events: usize,
        since: Option<Duration>,
    ) -> Result<Vec<TelemetryEvent>, TelemetryError>;
}

/// Filesystem reader over a workspace's run logs.
#[derive(Clone, Debug)]
pub struct TelemetryReader {
    runs_dir: PathBuf,
}

impl TelemetryReader {
    pub fn new(workspace: &Path) -> Self {
        Self {
            runs_dir: layout::runs_dir(workspace),
        }
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Session directory names, sorted. Empty when no runs were recorded.
    pub async fn list_sessions(&self) -> Result<Vec<String>, TelemetryError> {
        let mut entries = match tokio::fs::read_dir(&self.runs_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                sessions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    /// The last `max_events` records of one session, across its day files
    /// in name order. Unparseable lines are skipped.
    pub async fn read_session(
        &self,
        session: &str,
        max_events: usize,
    ) -> Result<Vec<TelemetryEvent>, TelemetryError> {
        let dir = self.runs_dir.join(layout::session_dir_name(session));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                files.push(path);
            }
        }
        files.sort();

        let mut events = Vec::new();
        for file in files {
            let bytes = tokio::fs::read(&file).await?;
            let text = String::from_utf8_lossy(&bytes);
            events.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .filter_map(|line| serde_json::from_str::<TelemetryEvent>(line).ok()),
            );
        }
        Ok(keep_last(events, max_events))
    }

    /// Every session's recent records, concatenated in session order and
    /// capped at `max_events` overall.
    ///
    /// Records with an unparseable timestamp survive the `since` filter.
    pub async fn read_recent(
        &self,
        max_events: usize,
        since: Option<Duration>,
    ) -> Result<Vec<TelemetryEvent>, TelemetryError> {
        let cutoff = since
            .and_then(|window| chrono::Duration::from_std(window).ok())
            .and_then(|window| Utc::now().checked_sub_signed(window));

        let mut all = Vec::new();
        for session in self.list_sessions().await? {
            all.extend(self.read_session(&session, max_events).await?);
        }
        if let Some(cutoff) = cutoff {
            all.retain(|event| {
                chrono::DateTime::parse_from_rfc3339(&event.timestamp)
                    .map(|at| at.with_timezone(&Utc) >= cutoff)
                    .unwrap_or(true)
            });
        }
        debug!(events = all.len(), "telemetry collected");
        Ok(keep_last(all, max_events))
    }
}

#[async_trait]
impl TelemetrySource for TelemetryReader {
    async fn collect(
        &self,
        max_events: usize,
        since: Option<Duration>,
    ) -> Result<Vec<TelemetryEvent>, TelemetryError> {
        self.read_recent(max_events, since).await
    }
}

fn keep_last(mut events: Vec<TelemetryEvent>, max_events: usize) -> Vec<TelemetryEvent> {
    if events.len() > max_events {
        events.drain(..events.len() - max_events);
    }
    events
}

// ── Simulated Source ────────────────────────────────────────────────────

/// In-memory source for tests.
pub struct SimulatedTelemetry {
    events: Vec<TelemetryEvent>,
    fail: bool,
}

impl SimulatedTelemetry {
    pub fn with_events(events: Vec<TelemetryEvent>) -> Self {
        Self { events, fail: false }
    }

    pub fn empty() -> Self {
        Self::with_events(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            events: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl TelemetrySource for SimulatedTelemetry {
    async fn collect(
        &self,
        max_events: usize,
        _since: Option<Duration>,
    ) -> Result<Vec<TelemetryEvent>, TelemetryError> {
        if self.fail {
            return Err(TelemetryError::Unavailable("simulated failure".into()));
        }
        Ok(keep_last(self.events.clone(), max_events))
    }
}
