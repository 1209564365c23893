//! Pipeline configuration, loaded from TOML.

use std::path::Path;
use std::time::Duration;

use evo_apply::{ApplyMode, ApplySettings, CommandTestRunner};
use evo_gatekeeper::{GatePolicy, DEFAULT_DENYLIST, DEFAULT_MAX_PATCH_LINES};
use evo_types::RiskThreshold;
use serde::{Deserialize, Serialize};

use crate::error::AutopilotError;

/// Controller settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    pub max_cycles: u32,
    /// Pause between cycles.
    #[serde(rename = "cooldown_secs", with = "secs")]
    pub cooldown: Duration,
    pub auto_approve_risk: RiskThreshold,
    /// Telemetry window; zero or negative reads everything.
    pub since_hours: f64,
    pub max_events: usize,
    pub dry_run: bool,
    pub stop_on_failure: bool,
    /// Bound on one proposal-source call.
    #[serde(rename = "proposal_timeout_secs", with = "secs")]
    pub proposal_timeout: Duration,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            max_cycles: 3,
            cooldown: Duration::from_secs(5),
            auto_approve_risk: RiskThreshold::Low,
            since_hours: 24.0,
            max_events: 500,
            dry_run: true,
            stop_on_failure: true,
            proposal_timeout: Duration::from_secs(120),
        }
    }
}

impl AutopilotConfig {
    /// `since_hours` as a window, `None` when it does not bound anything.
    pub fn since(&self) -> Option<Duration> {
        if self.since_hours > 0.0 {
            Duration::try_from_secs_f64(self.since_hours * 3600.0).ok()
        } else {
            None
        }
    }
}

/// Whole-pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub enabled: bool,
    /// Manual applies are live rather than dry-run by default.
    pub allow_apply_default: bool,
    pub allowlist_paths: Vec<String>,
    pub denylist_paths: Vec<String>,
    pub max_patch_lines: usize,
    pub test_command: Vec<String>,
    pub test_timeout_secs: u64,
    pub run_tests: bool,
    pub autopilot: AutopilotConfig,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_apply_default: false,
            allowlist_paths: Vec::new(),
            denylist_paths: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            max_patch_lines: DEFAULT_MAX_PATCH_LINES,
            test_command: vec!["cargo".into(), "test".into(), "--quiet".into()],
            test_timeout_secs: 300,
            run_tests: true,
            autopilot: AutopilotConfig::default(),
        }
    }
}

impl EvolutionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AutopilotError> {
        toml::from_str(text).map_err(|e| AutopilotError::Config(e.to_string()))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, AutopilotError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            allowlist_paths: self.allowlist_paths.clone(),
            denylist_paths: self.denylist_paths.clone(),
            max_patch_lines: self.max_patch_lines,
        }
    }

    pub fn apply_settings(&self) -> ApplySettings {
        ApplySettings {
            run_tests: self.run_tests,
        }
    }

    pub fn test_runner(&self) -> CommandTestRunner {
        CommandTestRunner::new(self.test_command.clone())
            .with_timeout(Duration::from_secs(self.test_timeout_secs))
    }

    /// Mode for a manual apply that did not ask for one explicitly.
    pub fn default_apply_mode(&self) -> ApplyMode {
        if self.allow_apply_default {
            ApplyMode::Live
        } else {
            ApplyMode::DryRun
        }
    }
}

/// `Duration` as fractional seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
