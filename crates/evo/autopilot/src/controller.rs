//! The autopilot loop.
//!
//! Each cycle runs strictly after the previous one:
//!
//! ```text
//! collect telemetry → diagnose → propose → record evolve_generated
//!   → gate (diff only) → decide → [apply_attempted → apply → apply_succeeded|apply_failed]
//! ```
//!
//! A cycle either completes, is skipped, or ends the run: an apply failure
//! with `stop_on_failure`, or an apply outcome the ledger could not record.
//! Nothing else inside a cycle can abort the run.

use std::path::{Path, PathBuf};
use std::time::Instant;

use evo_apply::{ApplyEngine, ApplyMode, GitWorkspace};
use evo_gatekeeper::validate;
use evo_ledger::EventLedger;
use evo_telemetry::{diagnose, TelemetryReader, TelemetrySource};
use evo_types::{layout, LifecycleEvent, Proposal};
use tracing::{debug, info, warn};

use crate::config::{AutopilotConfig, EvolutionConfig};
use crate::cycle::{CycleResult, NotAppliedReason, RunResult};
use crate::error::AutopilotError;
use crate::pacer::{Pacer, TokioPacer};
use crate::source::{HeuristicProposalSource, ProposalSource};

/// Skip reason when there is nothing to diagnose.
pub const NOTHING_TO_DIAGNOSE: &str = "no events or failures to diagnose";

/// Ledger `result` text is cut to this many characters.
const LEDGER_RESULT_CHARS: usize = 200;
/// Cycle `apply_result` is cut to this many characters.
const APPLY_RESULT_CHARS: usize = 500;
/// Error text on a skipped cycle is cut to this many characters.
const ERROR_CHARS: usize = 200;

/// Bounded diagnose → propose → gate → apply → record controller.
///
/// One instance per workspace. Running two against the same workspace is
/// unsupported: neither the ledger nor the working tree is locked.
pub struct Autopilot {
    config: AutopilotConfig,
    telemetry: Box<dyn TelemetrySource>,
    source: Box<dyn ProposalSource>,
    ledger: EventLedger,
    engine: ApplyEngine,
    pacer: Box<dyn Pacer>,
    history_path: Option<PathBuf>,
}

impl Autopilot {
    /// Controller with the heuristic source, the tokio pacer and no history.
    pub fn new(
        config: AutopilotConfig,
        telemetry: impl TelemetrySource + 'static,
        ledger: EventLedger,
        engine: ApplyEngine,
    ) -> Self {
        Self {
            config,
            telemetry: Box::new(telemetry),
            source: Box::new(HeuristicProposalSource),
            ledger,
            engine,
            pacer: Box::new(TokioPacer),
            history_path: None,
        }
    }

    /// Wire the real filesystem, `git` and test command for `workspace`.
    pub async fn from_config(
        workspace: &Path,
        config: &EvolutionConfig,
    ) -> Result<Self, AutopilotError> {
        if !config.enabled {
            return Err(AutopilotError::Config(
                "evolution pipeline is disabled (set enabled = true)".into(),
            ));
        }
        let ledger = EventLedger::open(workspace).await?;
        let engine = ApplyEngine::new(
            GitWorkspace::new(workspace),
            config.test_runner(),
            config.gate_policy(),
        )
        .with_settings(config.apply_settings());
        Ok(Self::new(
            config.autopilot.clone(),
            TelemetryReader::new(workspace),
            ledger,
            engine,
        )
        .with_history_file(layout::history_path(workspace)))
    }

    pub fn with_source(mut self, source: impl ProposalSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_pacer(mut self, pacer: impl Pacer + 'static) -> Self {
        self.pacer = Box::new(pacer);
        self
    }

    /// History file whose tail is handed to the proposal source.
    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    /// Run up to `max_cycles` cycles. Always returns a result.
    pub async fn run(&self) -> RunResult {
        let started = Instant::now();
        let max_cycles = self.config.max_cycles;
        let mut run = RunResult::default();
        info!(
            max_cycles,
            dry_run = self.config.dry_run,
            auto_approve_risk = %self.config.auto_approve_risk,
            source = self.source.name(),
            "autopilot run starting"
        );

        for cycle in 1..=max_cycles {
            let cycle_started = Instant::now();
            info!(cycle, max_cycles, "cycle starting");

            let (mut result, stop) = match self.run_cycle(cycle, &mut run).await {
                Ok(step) => step,
                Err(e) => {
                    warn!(cycle, error = %e, "cycle failed; skipping");
                    let reason = format!("Error: {}", truncate_chars(&e.to_string(), ERROR_CHARS));
                    (CycleResult::skipped(cycle, reason), false)
                }
            };
            result.duration_ms = elapsed_ms(cycle_started);

            if result.skipped {
                info!(cycle, reason = result.skip_reason.as_deref().unwrap_or(""), "cycle skipped");
            } else {
                info!(
                    cycle,
                    applied = result.applied,
                    gate_passed = result.gate_passed,
                    duration_ms = result.duration_ms,
                    "cycle finished"
                );
            }
            run.push(result);

            if stop {
                warn!(cycle, "stopping run early");
                run.stopped_early = true;
                break;
            }
            if cycle < max_cycles {
                self.pacer.cooldown(self.config.cooldown).await;
            }
        }

        run.total_duration_ms = elapsed_ms(started);
        info!(
            cycles_run = run.cycles_run,
            cycles_skipped = run.cycles_skipped,
            generated = run.proposals_generated,
            applied = run.proposals_applied,
            failed = run.proposals_failed,
            "autopilot run finished"
        );
        run
    }

    /// One cycle. The second value asks the loop to stop.
    async fn run_cycle(
        &self,
        cycle: u32,
        run: &mut RunResult,
    ) -> Result<(CycleResult, bool), AutopilotError> {
        let events = self
            .telemetry
            .collect(self.config.max_events, self.config.since())
            .await?;
        if events.is_empty() {
            return Ok((CycleResult::skipped(cycle, NOTHING_TO_DIAGNOSE), false));
        }

        let diagnosis = diagnose(&events);
        debug!(cycle, failures = diagnosis.failure_count, "diagnosis ready");

        let history = self.read_history().await?;
        let timeout = self.config.proposal_timeout;
        let proposal = tokio::time::timeout(timeout, self.source.propose(&diagnosis, &history))
            .await
            .map_err(|_| AutopilotError::ProposalTimeout(timeout))??;

        let generated = LifecycleEvent::generated(&proposal);
        self.ledger.record(&generated).await?;
        run.proposals_generated += 1;

        let (gate_passed, gate_reasons) = if proposal.has_diff() {
            let verdict = validate(&proposal, self.engine.policy());
            if !verdict.accepted {
                run.proposals_gated += 1;
            }
            (verdict.accepted, verdict.reasons())
        } else {
            (true, Vec::new())
        };

        let mut result = CycleResult {
            cycle,
            proposal_id: Some(proposal.id.to_string()),
            proposal_title: Some(proposal.title.clone()),
            risk_level: Some(proposal.risk_level),
            diagnosis_summary: diagnosis.summary.clone(),
            gate_passed,
            gate_reasons,
            ..Default::default()
        };

        if let Some(reason) = self.not_applied_reason(&proposal, gate_passed) {
            info!(cycle, proposal_id = %proposal.id, reason = %reason, "proposal not applied");
            result.apply_result = reason.to_string();
            result.not_applied = Some(reason);
            return Ok((result, false));
        }

        let attempted = LifecycleEvent::attempted(&proposal, &generated.event_id);
        self.ledger.record(&attempted).await?;

        let outcome = self.engine.apply(&proposal, ApplyMode::Live).await;
        result.applied = true;
        result.apply_result = truncate_chars(&outcome.message, APPLY_RESULT_CHARS);
        let mut stop = false;
        if outcome.success {
            run.proposals_applied += 1;
        } else {
            run.proposals_failed += 1;
            warn!(cycle, proposal_id = %proposal.id, stage = %outcome.stage, "apply failed");
            stop = self.config.stop_on_failure;
        }

        let tag = if outcome.success { "ok" } else { "fail" };
        let ledger_text = truncate_chars(&format!("{tag}: {}", outcome.message), LEDGER_RESULT_CHARS);
        let resolved =
            LifecycleEvent::resolved(&proposal, &attempted.event_id, outcome.success, ledger_text);
        if let Err(e) = self.ledger.record(&resolved).await {
            // the attempt stays unresolved in the ledger
            warn!(cycle, proposal_id = %proposal.id, error = %e, "apply outcome not recorded");
            result.ledger_error = Some(truncate_chars(&e.to_string(), ERROR_CHARS));
            stop = true;
        }
        Ok((result, stop))
    }

    /// First unmet apply precondition, or `None` when the proposal may be applied.
    fn not_applied_reason(&self, proposal: &Proposal, gate_passed: bool) -> Option<NotAppliedReason> {
        if self.config.dry_run {
            Some(NotAppliedReason::DryRun)
        } else if !self.config.auto_approve_risk.permits(proposal.risk_level) {
            Some(NotAppliedReason::RiskTooHigh)
        } else if !proposal.has_diff() {
            Some(NotAppliedReason::NoDiff)
        } else if !gate_passed {
            Some(NotAppliedReason::GateRejected)
        } else {
            None
        }
    }

    async fn read_history(&self) -> Result<String, AutopilotError> {
        let Some(path) = &self.history_path else {
            return Ok(String::new());
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// First `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
