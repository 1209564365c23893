//! Post-apply test execution.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

/// Upper bound on one test run unless configured otherwise.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Why a test run did not pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestFailure {
    NonZeroExit { code: Option<i32> },
    TimedOut { after_secs: u64 },
    ToolMissing { program: String },
    Spawn { error: String },
}

impl std::fmt::Display for TestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonZeroExit { code: Some(code) } => write!(f, "exit code {code}"),
            Self::NonZeroExit { code: None } => f.write_str("terminated by signal"),
            Self::TimedOut { after_secs } => write!(f, "timed out after {after_secs}s"),
            Self::ToolMissing { program } => write!(f, "command not found: {program}"),
            Self::Spawn { error } => write!(f, "could not start: {error}"),
        }
    }
}

/// Outcome of one test run. `output` is raw stdout followed by stderr.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub passed: bool,
    pub output: String,
    pub failure: Option<TestFailure>,
}

impl TestReport {
    pub fn pass(output: impl Into<String>) -> Self {
        Self {
            passed: true,
            output: output.into(),
            failure: None,
        }
    }

    pub fn fail(failure: TestFailure, output: impl Into<String>) -> Self {
        Self {
            passed: false,
            output: output.into(),
            failure: Some(failure),
        }
    }
}

/// Runs the project's tests against a working tree.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run with `root` as working directory. Never errors: every problem
    /// is a failed report.
    async fn run(&self, root: &Path) -> TestReport;

    /// Human-readable command line, recorded in commit messages.
    fn describe(&self) -> String;
}

// ── Command ─────────────────────────────────────────────────────────────

/// Runs an external command under a timeout; the child is killed on expiry.
#[derive(Clone, Debug)]
pub struct CommandTestRunner {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandTestRunner {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            timeout: DEFAULT_TEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run(&self, root: &Path) -> TestReport {
        let Some((program, args)) = self.command.split_first() else {
            return TestReport::fail(
                TestFailure::ToolMissing {
                    program: "<empty test command>".into(),
                },
                "",
            );
        };
        debug!(command = %self.describe(), "running tests");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let report = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => TestReport::fail(
                TestFailure::TimedOut {
                    after_secs: self.timeout.as_secs(),
                },
                "",
            ),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => TestReport::fail(
                TestFailure::ToolMissing {
                    program: program.clone(),
                },
                e.to_string(),
            ),
            Ok(Err(e)) => TestReport::fail(TestFailure::Spawn { error: e.to_string() }, ""),
            Ok(Ok(out)) => {
                let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
                output.push_str(&String::from_utf8_lossy(&out.stderr));
                if out.status.success() {
                    TestReport::pass(output)
                } else {
                    TestReport::fail(TestFailure::NonZeroExit { code: out.status.code() }, output)
                }
            }
        };
        if let Some(failure) = &report.failure {
            warn!(command = %self.describe(), %failure, "test run failed");
        }
        report
    }

    fn describe(&self) -> String {
        self.command.join(" ")
    }
}

// ── Simulated ───────────────────────────────────────────────────────────

/// Returns a fixed report and counts invocations. Clones share the count.
#[derive(Clone, Debug)]
pub struct SimulatedTestRunner {
    report: TestReport,
    runs: Arc<AtomicUsize>,
}

impl SimulatedTestRunner {
    pub fn passing() -> Self {
        Self::with_report(TestReport::pass("test result: ok"))
    }

    pub fn failing(output: impl Into<String>) -> Self {
        Self::with_report(TestReport::fail(TestFailure::NonZeroExit { code: Some(1) }, output))
    }

    pub fn timing_out() -> Self {
        Self::with_report(TestReport::fail(
            TestFailure::TimedOut {
                after_secs: DEFAULT_TEST_TIMEOUT.as_secs(),
            },
            "",
        ))
    }

    pub fn missing_tool() -> Self {
        Self::with_report(TestReport::fail(
            TestFailure::ToolMissing {
                program: "cargo".into(),
            },
            "",
        ))
    }

    pub fn with_report(report: TestReport) -> Self {
        Self {
            report,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for SimulatedTestRunner {
    async fn run(&self, _root: &Path) -> TestReport {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.report.clone()
    }

    fn describe(&self) -> String {
        "simulated".into()
    }
}
