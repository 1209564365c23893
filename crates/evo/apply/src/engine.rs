//! The apply state machine.
//!
//! ```text
//! START → validated ─┬─ (dry-run) → done
//!                    └─ prepared → branched → checked → applied → tested → committed
//!                                      any failure after branching → rolled back
//! ```
//!
//! A failed apply reverses the patch if it was applied, returns to the
//! previous branch and deletes the transaction branch, leaving the tree and
//! branch pointer as they were before the call.

use std::path::Path;

use chrono::{DateTime, Utc};
use evo_gatekeeper::{validate, GatePolicy};
use evo_types::Proposal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApplyError;
use crate::runner::{TestFailure, TestRunner};
use crate::workspace::{Checkpoint, TransactionalWorkspace};

/// Message returned by a successful dry run.
pub const DRY_RUN_MESSAGE: &str =
    "Dry-run: proposal passed gatekeeper validation. No files modified.";

/// Branch namespace for transactions.
pub const BRANCH_PREFIX: &str = "evo";

const MAX_SLUG_CHARS: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Validate only; never touch the workspace.
    DryRun,
    Live,
}

/// Last stage reached. On failure, the stage that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStage {
    Validation,
    Prepare,
    Branch,
    Check,
    Apply,
    Test,
    Commit,
    Done,
}

impl std::fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Prepare => "prepare",
            Self::Branch => "branch",
            Self::Check => "check",
            Self::Apply => "apply",
            Self::Test => "test",
            Self::Commit => "commit",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// `(success, message)` plus the stage it ended at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub success: bool,
    pub stage: ApplyStage,
    pub message: String,
}

impl ApplyOutcome {
    fn ok(stage: ApplyStage, message: impl Into<String>) -> Self {
        Self {
            success: true,
            stage,
            message: message.into(),
        }
    }

    fn failed(stage: ApplyStage, message: impl Into<String>) -> Self {
        Self {
            success: false,
            stage,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySettings {
    /// Run the test runner after applying.
    pub run_tests: bool,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self { run_tests: true }
    }
}

/// Applies gate-approved proposals to a [`TransactionalWorkspace`].
pub struct ApplyEngine {
    workspace: Box<dyn TransactionalWorkspace>,
    tests: Box<dyn TestRunner>,
    policy: GatePolicy,
    settings: ApplySettings,
}

impl ApplyEngine {
    pub fn new(
        workspace: impl TransactionalWorkspace + 'static,
        tests: impl TestRunner + 'static,
        policy: GatePolicy,
    ) -> Self {
        Self {
            workspace: Box::new(workspace),
            tests: Box::new(tests),
            policy,
            settings: ApplySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ApplySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    pub fn workspace_root(&self) -> &Path {
        self.workspace.root()
    }

    /// Run the state machine for `proposal`. Never panics or errors;
    /// failures are reported in the outcome.
    pub async fn apply(&self, proposal: &Proposal, mode: ApplyMode) -> ApplyOutcome {
        // Validation runs again here even when the caller already gated.
        let verdict = validate(proposal, &self.policy);
        if !verdict.accepted {
            let reasons: Vec<String> = verdict.reasons().iter().map(|r| format!("  - {r}")).collect();
            return ApplyOutcome::failed(
                ApplyStage::Validation,
                format!("Gatekeeper rejected proposal:\n{}", reasons.join("\n")),
            );
        }
        if mode == ApplyMode::DryRun {
            return ApplyOutcome::ok(ApplyStage::Validation, DRY_RUN_MESSAGE);
        }
        if !proposal.has_diff() {
            return ApplyOutcome::ok(ApplyStage::Done, "Empty diff: nothing to apply.");
        }

        let patch = match write_patch(&proposal.unified_diff).await {
            Ok(patch) => patch,
            Err(e) => {
                return ApplyOutcome::failed(
                    ApplyStage::Prepare,
                    format!("Could not stage patch to a scratch file: {e}"),
                )
            }
        };
        self.run_transaction(proposal, &patch).await
    }

    async fn run_transaction(&self, proposal: &Proposal, patch: &Path) -> ApplyOutcome {
        let tool = self.workspace.name().to_string();

        let checkpoint = if self.workspace.is_versioned().await {
            let branch = branch_name(&proposal.title, Utc::now());
            match self.workspace.begin(&branch).await {
                Ok(checkpoint) => {
                    info!(proposal_id = %proposal.id, branch = %branch, "apply branch created");
                    Some(checkpoint)
                }
                Err(e) => {
                    return ApplyOutcome::failed(
                        ApplyStage::Branch,
                        tool_message(&tool, &e, "Could not create apply branch"),
                    )
                }
            }
        } else {
            None
        };

        if let Err(e) = self.workspace.verify(patch).await {
            let msg = tool_message(&tool, &e, "Patch apply --check failed");
            return self.roll_back(proposal, checkpoint.as_ref(), None, ApplyStage::Check, msg).await;
        }

        if let Err(e) = self.workspace.stage(patch).await {
            let msg = tool_message(&tool, &e, "Patch apply failed");
            return self.roll_back(proposal, checkpoint.as_ref(), None, ApplyStage::Apply, msg).await;
        }

        if self.settings.run_tests {
            let report = self.tests.run(self.workspace.root()).await;
            if !report.passed {
                let msg = match &report.failure {
                    Some(TestFailure::ToolMissing { program }) => {
                        format!("Test command not found ({program}): cannot run tests.")
                    }
                    Some(failure) => {
                        format!("Tests failed after apply ({failure}).\n{}", report.output)
                    }
                    None => format!("Tests failed after apply.\n{}", report.output),
                };
                return self
                    .roll_back(proposal, checkpoint.as_ref(), Some(patch), ApplyStage::Test, msg)
                    .await;
            }
        }

        if let Some(checkpoint) = &checkpoint {
            let message = commit_message(proposal, self.tests_note());
            if let Err(e) = self.workspace.commit(&message).await {
                let (cause, reset) = e.into_parts();
                let msg = tool_message(&tool, &cause, "Commit failed");
                let leftovers = reset
                    .map(|r| vec![format!("unstage failed: {}", r.detail())])
                    .unwrap_or_default();
                return self
                    .roll_back_after(
                        proposal,
                        Some(checkpoint),
                        Some(patch),
                        ApplyStage::Commit,
                        msg,
                        leftovers,
                    )
                    .await;
            }
        }

        let branch = checkpoint
            .as_ref()
            .map(|c| c.branch.as_str())
            .unwrap_or("HEAD");
        info!(proposal_id = %proposal.id, branch = %branch, "proposal applied");
        ApplyOutcome::ok(
            ApplyStage::Done,
            format!("Proposal applied successfully on branch '{branch}'."),
        )
    }

    /// Undo in reverse order, then report `message` as a failure at `stage`.
    async fn roll_back(
        &self,
        proposal: &Proposal,
        checkpoint: Option<&Checkpoint>,
        applied_patch: Option<&Path>,
        stage: ApplyStage,
        message: String,
    ) -> ApplyOutcome {
        self.roll_back_after(proposal, checkpoint, applied_patch, stage, message, Vec::new())
            .await
    }

    /// [`Self::roll_back`], starting from cleanup `problems` already known.
    async fn roll_back_after(
        &self,
        proposal: &Proposal,
        checkpoint: Option<&Checkpoint>,
        applied_patch: Option<&Path>,
        stage: ApplyStage,
        message: String,
        mut problems: Vec<String>,
    ) -> ApplyOutcome {
        if let Some(patch) = applied_patch {
            if let Err(e) = self.workspace.revert(patch).await {
                problems.push(format!("revert failed: {}", e.detail()));
            }
        }
        if let Some(checkpoint) = checkpoint {
            if let Err(e) = self.workspace.abort(checkpoint).await {
                problems.push(format!(
                    "could not leave branch '{}': {}",
                    checkpoint.branch,
                    e.detail()
                ));
            }
        }

        if problems.is_empty() {
            info!(proposal_id = %proposal.id, %stage, "apply rolled back");
            ApplyOutcome::failed(stage, format!("{message}\nRolled back."))
        } else {
            warn!(proposal_id = %proposal.id, %stage, problems = problems.len(), "rollback incomplete");
            ApplyOutcome::failed(
                stage,
                format!("{message}\nRollback incomplete: {}", problems.join("; ")),
            )
        }
    }

    fn tests_note(&self) -> String {
        if self.settings.run_tests {
            self.tests.describe()
        } else {
            "skipped".into()
        }
    }
}

fn tool_message(tool: &str, error: &ApplyError, context: &str) -> String {
    if error.is_tool_missing() {
        format!("{tool} command not found: cannot apply patch.")
    } else {
        format!("{context}:\n{}", error.detail())
    }
}

/// Scratch copy of the diff; deleted when the returned path is dropped.
async fn write_patch(diff: &str) -> Result<tempfile::TempPath, ApplyError> {
    let file = tempfile::Builder::new()
        .prefix("evo-")
        .suffix(".patch")
        .tempfile()?;
    let path = file.into_temp_path();
    let mut body = diff.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

/// `evo/<YYYYmmddHHMMSS>-<slug>` where the slug is at most 30 ref-safe chars.
pub fn branch_name(title: &str, at: DateTime<Utc>) -> String {
    format!("{BRANCH_PREFIX}/{}-{}", at.format("%Y%m%d%H%M%S"), slug(title))
}

fn slug(title: &str) -> String {
    let mut out = String::new();
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let slug: String = out.chars().take(MAX_SLUG_CHARS).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "proposal".into()
    } else {
        slug.to_string()
    }
}

/// Commit message linking the code history to the ledger.
pub fn commit_message(proposal: &Proposal, tests: String) -> String {
    let title = proposal.title.lines().next().unwrap_or("").trim();
    format!(
        "evo: {title}\n\nEvo-Proposal-ID: {}\nRisk-Level: {}\nTests: {tests}",
        proposal.id, proposal.risk_level
    )
}
