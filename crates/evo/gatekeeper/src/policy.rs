//! Gate policy: which paths may change and how large a patch may be.

use serde::{Deserialize, Serialize};

/// Default maximum diff length, in lines.
pub const DEFAULT_MAX_PATCH_LINES: usize = 500;

/// Path prefixes no proposal may touch unless configured otherwise.
pub const DEFAULT_DENYLIST: [&str; 3] = [".env", ".git/", "secrets/"];

/// Rules a proposal is validated against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// When non-empty, every touched path must start with one of these.
    #[serde(default)]
    pub allowlist_paths: Vec<String>,
    /// A touched path starting with any of these is rejected.
    #[serde(default = "default_denylist")]
    pub denylist_paths: Vec<String>,
    #[serde(default = "default_max_patch_lines")]
    pub max_patch_lines: usize,
}

fn default_denylist() -> Vec<String> {
    DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect()
}

fn default_max_patch_lines() -> usize {
    DEFAULT_MAX_PATCH_LINES
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            allowlist_paths: Vec::new(),
            denylist_paths: default_denylist(),
            max_patch_lines: DEFAULT_MAX_PATCH_LINES,
        }
    }
}

impl GatePolicy {
    /// A policy with no path rules and the given size limit.
    pub fn permissive(max_patch_lines: usize) -> Self {
        Self {
            allowlist_paths: Vec::new(),
            denylist_paths: Vec::new(),
            max_patch_lines,
        }
    }

    pub fn with_allow(mut self, prefix: impl Into<String>) -> Self {
        self.allowlist_paths.push(prefix.into());
        self
    }

    pub fn with_deny(mut self, prefix: impl Into<String>) -> Self {
        self.denylist_paths.push(prefix.into());
        self
    }

    pub fn with_max_patch_lines(mut self, max: usize) -> Self {
        self.max_patch_lines = max;
        self
    }
}

/// Forward-slash form of a path for prefix comparison, without leading `./`.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}
