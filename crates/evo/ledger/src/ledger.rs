//! JSON-lines ledger file under `<workspace>/evo/events/events.jsonl`.
//!
//! Single writer per workspace. There is no file locking; two controllers
//! appending to the same ledger is a usage error.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use evo_types::{layout, EventId, LifecycleEvent};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::LedgerResult;

/// Append-only store of [`LifecycleEvent`]s.
#[derive(Clone, Debug)]
pub struct EventLedger {
    path: PathBuf,
}

impl EventLedger {
    /// Open the ledger for `workspace`, creating its directory if absent.
    pub async fn open(workspace: &Path) -> LedgerResult<Self> {
        Self::at(layout::events_path(workspace)).await
    }

    /// Open a ledger at an explicit file path.
    pub async fn at(path: PathBuf) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize, redact and append one event. Returns the event's id.
    pub async fn record(&self, event: &LifecycleEvent) -> LedgerResult<EventId> {
        let json = serde_json::to_string(event)?;
        let line = evo_redact::redact(&json);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // one write per line so a crash leaves at most one partial row
        let mut buf = line.into_bytes();
        buf.push(b'\n');
        file.write_all(&buf).await?;
        file.flush().await?;

        debug!(
            event_id = %event.event_id,
            kind = %event.kind,
            proposal_id = %event.proposal_id,
            "ledger event recorded"
        );
        Ok(event.event_id.clone())
    }

    /// All events in write order, optionally limited to the last `since`.
    ///
    /// Malformed lines are skipped. Under a recency filter, events whose
    /// timestamp does not parse are kept: damaged history stays visible
    /// instead of silently disappearing.
    pub async fn read(&self, since: Option<Duration>) -> LedgerResult<Vec<LifecycleEvent>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes);

        let cutoff = since
            .and_then(|window| chrono::Duration::from_std(window).ok())
            .and_then(|window| Utc::now().checked_sub_signed(window));

        let mut events = Vec::new();
        let mut skipped = 0usize;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event: LifecycleEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            if let (Some(cutoff), Some(at)) = (cutoff, event.parsed_timestamp()) {
                if at < cutoff {
                    continue;
                }
            }
            events.push(event);
        }
        if skipped > 0 {
            warn!(path = %self.path.display(), skipped, "skipped malformed ledger lines");
        }
        Ok(events)
    }

    /// Walk `parent_event_id` links from `event_id` back to the chain root.
    ///
    /// Returned root-first. Unknown ids yield an empty chain; a dangling
    /// parent or a cycle ends the walk.
    pub async fn resolve_chain(&self, event_id: &EventId) -> LedgerResult<Vec<LifecycleEvent>> {
        let events = self.read(None).await?;
        Ok(chain_of(&events, event_id))
    }
}

/// Causal chain ending at `event_id`, root first.
pub fn chain_of(events: &[LifecycleEvent], event_id: &EventId) -> Vec<LifecycleEvent> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = Some(event_id.clone());
    while let Some(id) = cursor {
        if !seen.insert(id.clone()) {
            break;
        }
        let Some(event) = events.iter().rev().find(|e| e.event_id == id) else {
            break;
        };
        cursor = event.parent_event_id.clone();
        chain.push(event.clone());
    }
    chain.reverse();
    chain
}
