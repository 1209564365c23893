//! The transactional-workspace seam and its implementations.
//!
//! The apply state machine only talks to [`TransactionalWorkspace`].
//! [`GitWorkspace`] drives a real checkout through `git`;
//! [`SimulatedWorkspace`] records calls and fails on demand for tests.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::ApplyError;

/// Where to return to when a transaction is aborted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Branch name, or commit id when HEAD was detached.
    pub previous_ref: String,
    /// Branch created for this transaction.
    pub branch: String,
}

/// A working tree that can hold one change in isolation.
#[async_trait]
pub trait TransactionalWorkspace: Send + Sync {
    fn root(&self) -> &Path;

    /// Name of the backing tool, for messages.
    fn name(&self) -> &str;

    /// Whether branches and commits are available. When false the engine
    /// still checks, applies, tests and reverts, but never branches or commits.
    async fn is_versioned(&self) -> bool;

    /// Create and switch to `branch`.
    async fn begin(&self, branch: &str) -> Result<Checkpoint, ApplyError>;

    /// Non-mutating check that `patch` applies cleanly.
    async fn verify(&self, patch: &Path) -> Result<(), ApplyError>;

    /// Apply `patch` to the working tree.
    async fn stage(&self, patch: &Path) -> Result<(), ApplyError>;

    /// Reverse a previously staged `patch`.
    async fn revert(&self, patch: &Path) -> Result<(), ApplyError>;

    /// Record every change in a commit. On failure nothing stays staged,
    /// or the error is [`ApplyError::IndexNotReset`].
    async fn commit(&self, message: &str) -> Result<(), ApplyError>;

    /// Return to `checkpoint.previous_ref` and delete the transaction branch.
    async fn abort(&self, checkpoint: &Checkpoint) -> Result<(), ApplyError>;
}

// ── Git ─────────────────────────────────────────────────────────────────

/// Default bound on a single git invocation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Workspace backed by the `git` executable.
#[derive(Clone, Debug)]
pub struct GitWorkspace {
    root: PathBuf,
    program: String,
    timeout: Duration,
}

impl GitWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            program: "git".into(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    /// Use a different git executable (a path, or a name looked up on PATH).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run git with `args` in the workspace root; stdout on success.
    async fn git(&self, args: &[&str]) -> Result<String, ApplyError> {
        let command = format!("git {}", args.join(" "));
        debug!(command = %command, "running git");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(ApplyError::Timeout {
                    command,
                    after: self.timeout,
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApplyError::ToolMissing {
                    tool: self.program.clone(),
                })
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                stderr = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            Err(ApplyError::CommandFailed { command, stderr })
        }
    }
}

fn path_arg(patch: &Path) -> String {
    patch.to_string_lossy().into_owned()
}

#[async_trait]
impl TransactionalWorkspace for GitWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn name(&self) -> &str {
        "git"
    }

    async fn is_versioned(&self) -> bool {
        matches!(
            self.git(&["rev-parse", "--is-inside-work-tree"]).await.as_deref(),
            Ok("true")
        )
    }

    async fn begin(&self, branch: &str) -> Result<Checkpoint, ApplyError> {
        let mut previous_ref = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if previous_ref == "HEAD" {
            previous_ref = self.git(&["rev-parse", "HEAD"]).await?;
        }
        self.git(&["checkout", "-q", "-b", branch]).await?;
        Ok(Checkpoint {
            previous_ref,
            branch: branch.to_string(),
        })
    }

    async fn verify(&self, patch: &Path) -> Result<(), ApplyError> {
        self.git(&["apply", "--check", &path_arg(patch)]).await.map(|_| ())
    }

    async fn stage(&self, patch: &Path) -> Result<(), ApplyError> {
        self.git(&["apply", &path_arg(patch)]).await.map(|_| ())
    }

    async fn revert(&self, patch: &Path) -> Result<(), ApplyError> {
        self.git(&["apply", "-R", &path_arg(patch)]).await.map(|_| ())
    }

    async fn commit(&self, message: &str) -> Result<(), ApplyError> {
        self.git(&["add", "-A"]).await?;
        if let Err(e) = self.git(&["commit", "-q", "-m", message]).await {
            // leave the index as it was before add
            return match self.git(&["reset", "-q"]).await {
                Ok(_) => Err(e),
                Err(reset) => Err(ApplyError::IndexNotReset {
                    cause: Box::new(e),
                    reset: Box::new(reset),
                }),
            };
        }
        Ok(())
    }

    async fn abort(&self, checkpoint: &Checkpoint) -> Result<(), ApplyError> {
        self.git(&["checkout", "-q", &checkpoint.previous_ref]).await?;
        self.git(&["branch", "-D", &checkpoint.branch]).await.map(|_| ())
    }
}

// ── Simulated ───────────────────────────────────────────────────────────

/// A call made against a [`SimulatedWorkspace`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkspaceCall {
    Begin(String),
    Verify,
    Stage,
    Revert,
    Commit(String),
    Abort(String),
}

impl WorkspaceCall {
    /// Whether the call changes the tree or branch pointer.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Verify)
    }
}

/// Operation at which a simulated failure is injected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    Verify,
    Stage,
    Revert,
    Commit,
    Abort,
}

/// Kind of simulated failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailMode {
    /// The tool ran and reported an error.
    Rejected,
    /// The tool is not installed.
    ToolMissing,
    /// The tool reported an error and its cleanup failed as well.
    RejectedUncleaned,
}

/// In-memory workspace that records calls. Clones share the call log.
#[derive(Clone, Debug)]
pub struct SimulatedWorkspace {
    root: PathBuf,
    versioned: bool,
    failures: Vec<(FailPoint, FailMode)>,
    calls: Arc<Mutex<Vec<WorkspaceCall>>>,
}

impl SimulatedWorkspace {
    /// A versioned workspace where every operation succeeds.
    pub fn succeeding() -> Self {
        Self {
            root: PathBuf::from("."),
            versioned: true,
            failures: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A plain directory without version control.
    pub fn unversioned() -> Self {
        Self {
            versioned: false,
            ..Self::succeeding()
        }
    }

    /// Fail at `point` with a tool-reported error.
    pub fn failing_at(point: FailPoint) -> Self {
        Self::succeeding().with_failure(point, FailMode::Rejected)
    }

    pub fn with_failure(mut self, point: FailPoint, mode: FailMode) -> Self {
        self.failures.push((point, mode));
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn calls(&self) -> Vec<WorkspaceCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: WorkspaceCall, point: FailPoint) -> Result<(), ApplyError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        match self.failures.iter().find(|(p, _)| *p == point) {
            None => Ok(()),
            Some((_, FailMode::ToolMissing)) => Err(ApplyError::ToolMissing { tool: "git".into() }),
            Some((_, FailMode::Rejected)) => Err(simulated_failure(point)),
            Some((_, FailMode::RejectedUncleaned)) => Err(ApplyError::IndexNotReset {
                cause: Box::new(simulated_failure(point)),
                reset: Box::new(ApplyError::CommandFailed {
                    command: "reset".into(),
                    stderr: "simulated reset failure".into(),
                }),
            }),
        }
    }
}

fn simulated_failure(point: FailPoint) -> ApplyError {
    ApplyError::CommandFailed {
        command: format!("{point:?}").to_lowercase(),
        stderr: format!("simulated {point:?} failure"),
    }
}

#[async_trait]
impl TransactionalWorkspace for SimulatedWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn name(&self) -> &str {
        "simulated"
    }

    async fn is_versioned(&self) -> bool {
        self.versioned
    }

    async fn begin(&self, branch: &str) -> Result<Checkpoint, ApplyError> {
        self.record(WorkspaceCall::Begin(branch.to_string()), FailPoint::Begin)?;
        Ok(Checkpoint {
            previous_ref: "main".into(),
            branch: branch.to_string(),
        })
    }

    async fn verify(&self, _patch: &Path) -> Result<(), ApplyError> {
        self.record(WorkspaceCall::Verify, FailPoint::Verify)
    }

    async fn stage(&self, _patch: &Path) -> Result<(), ApplyError> {
        self.record(WorkspaceCall::Stage, FailPoint::Stage)
    }

    async fn revert(&self, _patch: &Path) -> Result<(), ApplyError> {
        self.record(WorkspaceCall::Revert, FailPoint::Revert)
    }

    async fn commit(&self, message: &str) -> Result<(), ApplyError> {
        self.record(WorkspaceCall::Commit(message.to_string()), FailPoint::Commit)
    }

    async fn abort(&self, checkpoint: &Checkpoint) -> Result<(), ApplyError> {
        self.record(WorkspaceCall::Abort(checkpoint.branch.clone()), FailPoint::Abort)
    }
}
