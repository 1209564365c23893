//! Read-only health checks over a workspace and its configuration.

use std::path::Path;

use evo_apply::ApplyMode;
use evo_types::{layout, RiskThreshold};
use serde::{Deserialize, Serialize};

use crate::config::EvolutionConfig;

const PROBE_FILE: &str = ".doctor_write_probe";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warn,
    Error,
}

/// One check and its verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorCheck {
    pub name: String,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
}

impl DoctorCheck {
    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            severity: Severity::Ok,
            message: message.into(),
        }
    }

    /// Passes, but deserves attention.
    fn warn(name: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            ..Self::ok(name, message)
        }
    }

    fn error(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Run every check. Configuration is never modified; the only write is a
/// probe file in the runs directory, removed immediately.
pub async fn run_checks(workspace: &Path, config: &EvolutionConfig) -> Vec<DoctorCheck> {
    let mut checks = Vec::new();

    checks.push(if config.enabled {
        DoctorCheck::ok("enabled", "Evolution pipeline is enabled.")
    } else {
        DoctorCheck::error("enabled", "Evolution pipeline is disabled. Set enabled = true.")
    });

    checks.push(match config.default_apply_mode() {
        ApplyMode::Live => DoctorCheck::warn(
            "dry_run_default",
            "allow_apply_default = true: manual applies modify the workspace unless dry-run is requested.",
        ),
        ApplyMode::DryRun => {
            DoctorCheck::ok("dry_run_default", "Dry-run is the default (allow_apply_default = false).")
        }
    });

    checks.push(check_runs_dir(workspace).await);

    checks.push(if config.allowlist_paths.is_empty() {
        DoctorCheck::warn("allowlist_paths", "Allowlist is empty: every path is allowed. Consider restricting.")
    } else {
        DoctorCheck::ok(
            "allowlist_paths",
            format!(
                "Allowlist ({} entries): {}",
                config.allowlist_paths.len(),
                config.allowlist_paths.join(", ")
            ),
        )
    });

    checks.push(if config.denylist_paths.is_empty() {
        DoctorCheck::error(
            "denylist_paths",
            "Denylist is empty: no path is blocked. Add at least .env, .git/, secrets/.",
        )
    } else {
        DoctorCheck::ok(
            "denylist_paths",
            format!(
                "Denylist ({} entries): {}",
                config.denylist_paths.len(),
                config.denylist_paths.join(", ")
            ),
        )
    });

    checks.push(if config.test_command.is_empty() {
        DoctorCheck::error("test_command", "test_command is empty: live applies cannot run tests.")
    } else {
        DoctorCheck::ok("test_command", format!("Tests run with: {}", config.test_command.join(" ")))
    });

    checks.push(match config.autopilot.auto_approve_risk {
        RiskThreshold::High => DoctorCheck::warn(
            "auto_approve_risk",
            "auto_approve_risk = high: the autopilot may apply high-risk proposals unattended.",
        ),
        threshold => DoctorCheck::ok("auto_approve_risk", format!("Auto-approve up to: {threshold}")),
    });

    checks
}

async fn check_runs_dir(workspace: &Path) -> DoctorCheck {
    let runs = layout::runs_dir(workspace);
    if !runs.is_dir() {
        return DoctorCheck::ok(
            "runs_dir_writable",
            format!("Runs directory does not exist yet: {}", runs.display()),
        );
    }
    let probe = runs.join(PROBE_FILE);
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            DoctorCheck::ok("runs_dir_writable", format!("Runs directory writable: {}", runs.display()))
        }
        Err(e) => DoctorCheck::error(
            "runs_dir_writable",
            format!("Runs directory not writable: {} ({e})", runs.display()),
        ),
    }
}

/// Highest severity among `checks`.
pub fn worst(checks: &[DoctorCheck]) -> Severity {
    checks.iter().map(|c| c.severity).max().unwrap_or(Severity::Ok)
}

/// Remediation hints for the checks that did not pass cleanly, followed by
/// the usual first steps.
pub fn next_steps(workspace: &Path, checks: &[DoctorCheck]) -> Vec<String> {
    let runs = layout::runs_dir(workspace);
    let mut steps: Vec<String> = checks
        .iter()
        .filter(|check| check.severity != Severity::Ok)
        .filter_map(|check| match check.name.as_str() {
            "enabled" => Some("Set `enabled = true` in evo.toml.".to_string()),
            "dry_run_default" => {
                Some("Set `allow_apply_default = false` to keep manual applies dry-run.".to_string())
            }
            "runs_dir_writable" => Some(format!("Make {} writable by the agent.", runs.display())),
            "allowlist_paths" => {
                Some("Limit `allowlist_paths` to the directories the autopilot may edit.".to_string())
            }
            "denylist_paths" => {
                Some("Add `.env`, `.git/` and `secrets/` to `denylist_paths`.".to_string())
            }
            "test_command" => Some(r#"Set `test_command`, e.g. ["cargo", "test"]."#.to_string()),
            "auto_approve_risk" => {
                Some("Lower `autopilot.auto_approve_risk` to \"low\" or \"none\".".to_string())
            }
            _ => None,
        })
        .collect();

    if !runs.is_dir() {
        steps.push(format!(
            "Record an agent session: {}/<session>/<YYYYMMDD>.jsonl",
            runs.display()
        ));
    }
    steps.push(format!(
        "Run one dry-run cycle (autopilot.dry_run = true) and read {}.",
        layout::events_path(workspace).display()
    ));
    steps.push(format!("List `{}/` in .gitignore.", layout::STATE_DIR));
    steps
}
