//! On-disk locations under a workspace root.

use std::path::{Path, PathBuf};

/// State directory created under the workspace.
pub const STATE_DIR: &str = "evo";

/// `<workspace>/evo/events/events.jsonl`
pub fn events_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("events").join("events.jsonl")
}

/// `<workspace>/evo/runs` — one sub-directory per session.
pub fn runs_dir(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("runs")
}

/// `<workspace>/memory/HISTORY.md`, optional context for proposal sources.
pub fn history_path(workspace: &Path) -> PathBuf {
    workspace.join("memory").join("HISTORY.md")
}

/// Directory-safe form of a session key (`cli:42` → `cli_42`).
pub fn session_dir_name(session_key: &str) -> String {
    session_key.replace([':', '/', '\\'], "_")
}
