//! Merge-and-test and auto-merge operations run after a worker exits.

use crate::error::{CorralError, Result};
use crate::git::run_git;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Outcome of running the project's `merge_and_test` command.
#[derive(Debug, Clone)]
pub struct MergeTestOutcome {
    pub success: bool,
    pub failure_reason: Option<String>,
    pub output: String,
}

/// Fallback timeout when a caller doesn't have a configured value handy.
pub const DEFAULT_MERGE_TEST_TIMEOUT: Duration = Duration::from_secs(600);
const MERGE_TEST_ERROR_MARKER: &str = "MERGE_TEST_ERROR:";

/// Run the project's `merge_and_test` command in the worktree.
///
/// The command is expected to merge the task branch into the base branch
/// (or validate that it would) and run the project's test suite, emitting
/// `MERGE_TEST_ERROR: <reason>` on a line by itself when it wants to surface
/// a specific failure reason instead of the last line of output.
///
/// # Arguments
///
/// * `worktree_dir` - The worktree the task ran in.
/// * `repo_dir` - The project's primary working clone (merge target).
/// * `command` - The project's configured merge_and_test command (shell words).
/// * `base` - Base branch name.
/// * `worker_id` - Worker slot id, exported as `WORKER_ID`.
/// * `task_id` - Task id, exported as `TASK_ID`.
/// * `timeout` - Configured `merge_test_timeout_secs`.
pub fn merge_and_test(
    worktree_dir: &Path,
    repo_dir: &Path,
    command: &[String],
    base: &str,
    worker_id: &str,
    task_id: &str,
    timeout: Duration,
) -> Result<MergeTestOutcome> {
    if command.is_empty() {
        return Err(CorralError::ConfigError(
            "merge_and_test command is empty".to_string(),
        ));
    }

    let mut cmd = Command::new(&command[0]);
    cmd.args(&command[1..])
        .current_dir(worktree_dir)
        .env("WORKTREE_DIR", worktree_dir)
        .env("REPO_DIR", repo_dir)
        .env("BRANCH_BASE", base)
        .env("WORKER_ID", worker_id)
        .env("TASK_ID", task_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let (tx, rx) = std::sync::mpsc::channel();
    let mut child = cmd
        .spawn()
        .map_err(|e| CorralError::ContainerError(format!("failed to run merge_and_test: {}", e)))?;

    std::thread::spawn(move || {
        let result = child.wait_with_output();
        let _ = tx.send(result);
    });

    let wait_result = rx.recv_timeout(timeout);

    let output = match wait_result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Ok(MergeTestOutcome {
                success: false,
                failure_reason: Some(format!("merge_and_test execution error: {}", e)),
                output: String::new(),
            });
        }
        Err(_) => {
            return Ok(MergeTestOutcome {
                success: false,
                failure_reason: Some(format!("merge_and_test timeout after {}s", timeout.as_secs())),
                output: String::new(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = [stdout.as_ref(), stderr.as_ref()]
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join("\n");

    let success = output.status.success();

    let mut reason = None;
    for line in combined.lines().rev() {
        if let Some(idx) = line.find(MERGE_TEST_ERROR_MARKER) {
            reason = Some(line[idx + MERGE_TEST_ERROR_MARKER.len()..].trim().to_string());
            break;
        }
    }

    if reason.is_none() && !success {
        reason = combined
            .lines()
            .next_back()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .or_else(|| Some(format!("merge_and_test exit code {}", output.status.code().unwrap_or(-1))));
    }

    Ok(MergeTestOutcome {
        success,
        failure_reason: reason,
        output: combined,
    })
}

/// Outcome of attempting to auto-merge a finished task branch.
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    /// Merge succeeded; carries the resulting commit on the base branch.
    Merged(String),
    /// Merge could not be completed; the branch is left intact for manual merge.
    Failed,
}

/// Merge `branch` into `base` within `repo_dir`, optionally pushing the result.
///
/// Mirrors the worker pool's auto-merge step exactly:
/// 1. Stash any local dirty state in `repo_dir` (including untracked files).
/// 2. Remove an untracked `CLAUDE.md` left behind from worktree setup.
/// 3. Checkout `base`, falling back to `-B base origin/base` if that fails.
/// 4. Verify `branch` exists, then `git merge branch --no-edit`.
/// 5. On merge failure, `git merge --abort` and report `Failed`.
/// 6. On success, optionally push `base` to `origin` (best-effort, 120s timeout).
pub fn auto_merge(
    repo_dir: &Path,
    branch: &str,
    base: &str,
    auto_push: bool,
    worker_id: &str,
) -> MergeOutcome {
    if !stash_dirty_repo(repo_dir, worker_id) {
        return MergeOutcome::Failed;
    }

    let claude_md = repo_dir.join("CLAUDE.md");
    if claude_md.exists() {
        let tracked = run_git(repo_dir, &["ls-files", "--error-unmatch", "CLAUDE.md"]).is_ok();
        if !tracked {
            let _ = std::fs::remove_file(&claude_md);
        }
    }

    if run_git(repo_dir, &["checkout", base]).is_err() {
        let remote_base = format!("origin/{}", base);
        if run_git(repo_dir, &["checkout", "-B", base, &remote_base]).is_err() {
            return MergeOutcome::Failed;
        }
    }

    if run_git(repo_dir, &["rev-parse", "--verify", branch]).is_err() {
        return MergeOutcome::Failed;
    }

    if run_git(repo_dir, &["merge", branch, "--no-edit"]).is_err() {
        let _ = run_git(repo_dir, &["merge", "--abort"]);
        return MergeOutcome::Failed;
    }

    if auto_push {
        let has_remote = run_git(repo_dir, &["remote"])
            .map(|o| !o.stdout.trim().is_empty())
            .unwrap_or(false);
        if has_remote {
            let _ = push_with_timeout(repo_dir, base);
        }
    }

    match run_git(repo_dir, &["rev-parse", "HEAD"]) {
        Ok(output) => MergeOutcome::Merged(output.stdout),
        Err(_) => MergeOutcome::Failed,
    }
}

fn stash_dirty_repo(repo_dir: &Path, worker_id: &str) -> bool {
    let status = match run_git(repo_dir, &["status", "--porcelain"]) {
        Ok(s) => s,
        Err(_) => return false,
    };

    if status.stdout.trim().is_empty() {
        return true;
    }

    let stash_msg = format!("auto-merge preflight ({})", worker_id);
    run_git(
        repo_dir,
        &["stash", "push", "--include-untracked", "-m", &stash_msg],
    )
    .is_ok()
}

fn push_with_timeout(repo_dir: &Path, base: &str) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.current_dir(repo_dir)
        .args(["push", "origin", base])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let (tx, rx) = std::sync::mpsc::channel();
    let mut child = cmd
        .spawn()
        .map_err(|e| CorralError::GitError(format!("failed to spawn push: {}", e)))?;

    std::thread::spawn(move || {
        let result = child.wait();
        let _ = tx.send(result);
    });

    match rx.recv_timeout(Duration::from_secs(120)) {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(CorralError::GitError(format!(
            "push to origin/{} failed with status {}",
            base, status
        ))),
        Ok(Err(e)) => Err(CorralError::GitError(format!("push failed: {}", e))),
        Err(_) => Err(CorralError::GitError(format!(
            "push to origin/{} timed out after 120s",
            base
        ))),
    }
}
