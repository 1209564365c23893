//! End-to-end test: transactional apply against a real git repository.
//!
//! Skipped when `git` is not installed.

use std::path::Path;

use evo_apply::{ApplyEngine, ApplyMode, ApplyStage, CommandTestRunner, GitWorkspace};
use evo_gatekeeper::GatePolicy;
use evo_tests::{git, git_available, init_git_repo, snapshot, RETRY_DIFF, RETRY_ORIGINAL};
use evo_types::{Proposal, RiskLevel};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn retry_proposal() -> Proposal {
    Proposal::new("raise retry count")
        .with_id("p-git-1")
        .with_risk(RiskLevel::Low)
        .with_file("src/retry.rs")
        .with_diff(RETRY_DIFF)
        .with_test("sh -c true")
}

fn engine(dir: &Path, test_command: &[&str]) -> ApplyEngine {
    ApplyEngine::new(
        GitWorkspace::new(dir),
        CommandTestRunner::new(test_command.iter().map(|s| s.to_string()).collect()),
        GatePolicy::default().with_allow("src/"),
    )
}

fn retry_source(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("src/retry.rs")).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_tests_restore_repository_exactly() {
    if !git_available() {
        eprintln!("git not found; skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    init_git_repo(dir.path());
    let before = snapshot(dir.path());
    let engine = engine(dir.path(), &["sh", "-c", "exit 3"]);

    for attempt in 0..2 {
        let outcome = engine.apply(&retry_proposal(), ApplyMode::Live).await;
        assert!(!outcome.success, "attempt {attempt}");
        assert_eq!(outcome.stage, ApplyStage::Test);
        assert!(outcome.message.contains("exit code 3"), "{}", outcome.message);
        assert!(outcome.message.ends_with("Rolled back."), "{}", outcome.message);

        assert_eq!(snapshot(dir.path()), before, "attempt {attempt}");
        assert_eq!(retry_source(dir.path()), RETRY_ORIGINAL);
    }
}

#[tokio::test]
async fn patch_that_does_not_apply_is_rolled_back() {
    if !git_available() {
        eprintln!("git not found; skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    init_git_repo(dir.path());
    let before = snapshot(dir.path());

    let stale = retry_proposal().with_diff(RETRY_DIFF.replace("-let n = 1;", "-let n = 9;"));
    let outcome = engine(dir.path(), &["true"]).apply(&stale, ApplyMode::Live).await;
    assert!(!outcome.success);
    assert_eq!(outcome.stage, ApplyStage::Check);
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn passing_tests_commit_on_evo_branch() {
    if !git_available() {
        eprintln!("git not found; skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    init_git_repo(dir.path());
    let base = snapshot(dir.path());

    let outcome = engine(dir.path(), &["true"])
        .apply(&retry_proposal(), ApplyMode::Live)
        .await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.stage, ApplyStage::Done);

    let branch = git(dir.path(), &["rev-parse", "--abbrev-ref", "HEAD"]);
    assert!(branch.starts_with("evo/"), "{branch}");
    assert!(branch.ends_with("-raise-retry-count"), "{branch}");
    assert_eq!(retry_source(dir.path()), "let n = 3;\n");
    assert_eq!(git(dir.path(), &["status", "--porcelain"]), "");

    let body = git(dir.path(), &["log", "-1", "--format=%B"]);
    assert!(body.starts_with("evo: raise retry count"));
    assert!(body.contains("Evo-Proposal-ID: p-git-1"));
    assert_eq!(git(dir.path(), &["rev-parse", "HEAD~1"]), base.head);
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    if !git_available() {
        eprintln!("git not found; skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    init_git_repo(dir.path());
    let before = snapshot(dir.path());
    let outcome = engine(dir.path(), &["true"])
        .apply(&retry_proposal(), ApplyMode::DryRun)
        .await;
    assert!(outcome.success);
    assert_eq!(snapshot(dir.path()), before);
}
