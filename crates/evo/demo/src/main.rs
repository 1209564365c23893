#![deny(unsafe_code)]
//! Evolution pipeline demo.
//!
//! Builds a scratch workspace and walks through:
//! 1. seeding run telemetry and loading `evo.toml`
//! 2. doctor checks
//! 3. a dry-run autopilot with a scripted reasoning provider
//! 4. the gatekeeper rejecting a hostile proposal
//! 5. a live apply that fails its tests and rolls back
//! 6. the ledger report
//!
//! No git repository or network access is required.

use std::path::Path;

use evo_apply::{ApplyEngine, ApplyMode, SimulatedTestRunner, SimulatedWorkspace};
use evo_autopilot::{
    next_steps, run_checks, Autopilot, EvolutionConfig, ReasoningProposalSource, ScriptedProvider,
    Severity,
};
use evo_gatekeeper::validate;
use evo_ledger::{EventLedger, LedgerReport};
use evo_telemetry::TelemetryReader;
use evo_types::{layout, Proposal, RiskLevel, TelemetryEvent};
use tracing_subscriber::EnvFilter;

// ── Formatting Helpers ──────────────────────────────────────────────────

fn section(title: &str) {
    println!();
    println!(" ── {title} {}", "─".repeat(60usize.saturating_sub(title.len())));
}

fn ok(msg: &str) {
    println!("   [OK]  {msg}");
}

fn info(msg: &str) {
    println!("   [--]  {msg}");
}

fn warn(msg: &str) {
    println!("   [!!]  {msg}");
}

const CONFIG: &str = r#"
enabled = true
allowlist_paths = ["src/", "tests/"]

[autopilot]
max_cycles = 2
cooldown_secs = 0.1
auto_approve_risk = "low"
"#;

const PROVIDER_REPLY: &str = r#"```json
{
  "title": "retry shell commands once",
  "objective": "Reduce transient shell failures",
  "evidence": ["shell failed twice in the last day"],
  "risk_level": "low",
  "files_touched": ["src/tools/shell.rs"],
  "unified_diff": "--- a/src/tools/shell.rs\n+++ b/src/tools/shell.rs\n@@ -1 +1 @@\n-const RETRIES: u32 = 0;\n+const RETRIES: u32 = 1;\n",
  "tests_to_run": ["cargo test -p tools"],
  "rollback_plan": "git revert"
}
```"#;

// ── Main ────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run_demo().await {
        eprintln!();
        eprintln!("   [FATAL]  Demo failed: {e}");
        std::process::exit(1);
    }

    println!();
    println!("  Demo complete.");
}

async fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    let scratch = tempfile::TempDir::new()?;
    let ws = scratch.path();

    // ── Phase A: Workspace ──────────────────────────────────────────
    section("Phase A: Scratch workspace");
    seed_workspace(ws).await?;
    let config = EvolutionConfig::load(&ws.join("evo.toml"))?;
    ok(&format!("Workspace at {}", ws.display()));
    info(&format!(
        "max_cycles={}  dry_run={}  auto_approve_risk={}",
        config.autopilot.max_cycles, config.autopilot.dry_run, config.autopilot.auto_approve_risk
    ));

    // ── Phase B: Doctor ─────────────────────────────────────────────
    section("Phase B: Doctor");
    let checks = run_checks(ws, &config).await;
    for check in &checks {
        let line = format!("{:<18} {}", check.name, check.message);
        match check.severity {
            Severity::Ok => ok(&line),
            Severity::Warn | Severity::Error => warn(&line),
        }
    }
    for step in next_steps(ws, &checks) {
        info(&format!("next: {step}"));
    }

    // ── Phase C: Dry-run autopilot ──────────────────────────────────
    section("Phase C: Dry-run autopilot");
    let provider = ScriptedProvider::replying(PROVIDER_REPLY);
    let pilot = Autopilot::from_config(ws, &config)
        .await?
        .with_source(ReasoningProposalSource::new(provider));
    let run = pilot.run().await;
    for cycle in &run.cycle_results {
        info(&format!(
            "cycle {}  proposal={:?}  gate_passed={}  result={}",
            cycle.cycle,
            cycle.proposal_title.as_deref().unwrap_or("-"),
            cycle.gate_passed,
            cycle.apply_result
        ));
    }
    println!("{}", serde_json::to_string_pretty(&run)?);

    // ── Phase D: Gatekeeper ─────────────────────────────────────────
    section("Phase D: Gatekeeper");
    let hostile = Proposal::new("exfiltrate")
        .with_risk(RiskLevel::Low)
        .with_file("src/lib.rs")
        .with_diff("--- a/.env\n+++ b/.env\n@@ -0,0 +1 @@\n+eval(open('/etc/passwd').read())\n");
    let verdict = validate(&hostile, &config.gate_policy());
    warn(&format!("accepted={}", verdict.accepted));
    for reason in verdict.reasons() {
        info(&reason);
    }

    // ── Phase E: Live apply with failing tests ──────────────────────
    section("Phase E: Live apply, failing tests");
    let workspace = SimulatedWorkspace::succeeding().with_root(ws);
    let engine = ApplyEngine::new(
        workspace.clone(),
        SimulatedTestRunner::failing("test retry::once ... FAILED"),
        config.gate_policy(),
    );
    let proposal = Proposal::new("retry shell commands once")
        .with_file("src/tools/shell.rs")
        .with_diff("--- a/src/tools/shell.rs\n+++ b/src/tools/shell.rs\n@@ -1 +1 @@\n-a\n+b\n");
    let outcome = engine.apply(&proposal, ApplyMode::Live).await;
    warn(&format!("success={}  stage={}", outcome.success, outcome.stage));
    for line in outcome.message.lines() {
        info(line);
    }
    info(&format!("workspace calls: {:?}", workspace.calls()));

    // ── Phase F: Ledger report ──────────────────────────────────────
    section("Phase F: Ledger report");
    let ledger = EventLedger::open(ws).await?;
    let events = ledger.read(None).await?;
    let telemetry = TelemetryReader::new(ws).read_recent(500, None).await?;
    let report = LedgerReport::from_events(&events, Some(&telemetry), 5);
    ok(&format!("{} ledger events at {}", events.len(), layout::events_path(ws).display()));
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

async fn seed_workspace(ws: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::write(ws.join("evo.toml"), CONFIG).await?;

    let session = layout::runs_dir(ws).join(layout::session_dir_name("cli:direct"));
    tokio::fs::create_dir_all(&session).await?;
    let events = [
        TelemetryEvent::tool_failure("shell"),
        TelemetryEvent::tool_failure("shell"),
        TelemetryEvent::tool_failure("web_fetch"),
        TelemetryEvent::exception("TimeoutError: upstream did not answer in 30s"),
    ];
    let mut body = String::new();
    for event in &events {
        body.push_str(&serde_json::to_string(&event.clone().with_session("cli:direct"))?);
        body.push('\n');
    }
    tokio::fs::write(session.join("20260101.jsonl"), body).await?;
    Ok(())
}
