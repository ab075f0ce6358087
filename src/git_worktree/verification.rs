//! Worktree verification operations.

use crate::error::{CorralError, Result};
use crate::git::run_git;
use std::path::Path;

/// Get the current branch name in a worktree.
///
/// # Arguments
///
/// * `worktree_path` - Path to the worktree
///
/// # Returns
///
/// * `Ok(String)` - The current branch name
/// * `Err(CorralError::GitError)` - Failed to get branch name (exit code 3)
pub fn get_current_branch<P: AsRef<Path>>(worktree_path: P) -> Result<String> {
    let output = run_git(worktree_path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(output.stdout)
}

/// Verify that a worktree is on the expected branch.
///
/// # Arguments
///
/// * `worktree_path` - Path to the worktree
/// * `expected_branch` - The branch the worktree should be on
///
/// # Returns
///
/// * `Ok(())` - Worktree is on the expected branch
/// * `Err(CorralError::GitError)` - Worktree is on a different branch
pub fn verify_worktree_branch<P: AsRef<Path>>(
    worktree_path: P,
    expected_branch: &str,
) -> Result<()> {
    let actual_branch = get_current_branch(&worktree_path)?;

    if actual_branch != expected_branch {
        return Err(CorralError::GitError(format!(
            "worktree is on branch '{}' but expected '{}'.\n\n\
             The worktree may have been modified outside of corral.",
            actual_branch, expected_branch
        )));
    }

    Ok(())
}

/// Count commits reachable from `branch` but not from `base_ref`.
///
/// # Arguments
///
/// * `worktree_path` - Path to the worktree (or any checkout of the repo)
/// * `base_ref` - The ref the branch was cut from (e.g. `origin/main`)
/// * `branch` - The task branch to check
pub fn commits_ahead<P: AsRef<Path>>(worktree_path: P, base_ref: &str, branch: &str) -> Result<u32> {
    let range = format!("{}..{}", base_ref, branch);
    let output = run_git(worktree_path, &["rev-list", "--count", &range])?;
    output.stdout.trim().parse::<u32>().map_err(|e| {
        CorralError::GitError(format!("failed to parse commit count '{}': {}", output.stdout, e))
    })
}

/// Verify that a task branch has at least one commit beyond its base ref.
///
/// This is the guard the scheduler runs after a worker exits: an agent that
/// made no commits produced nothing mergeable, and the task must not proceed
/// to merge_and_test.
///
/// # Returns
///
/// * `Ok(())` - At least one new commit exists on `branch` beyond `base_ref`
/// * `Err(CorralError::GitError)` - No new commits were made
pub fn verify_commit<P: AsRef<Path>>(worktree_path: P, base_ref: &str, branch: &str) -> Result<()> {
    let ahead = commits_ahead(&worktree_path, base_ref, branch)?;
    if ahead == 0 {
        return Err(CorralError::GitError(format!(
            "branch '{}' has no commits beyond base ref '{}'",
            branch, base_ref
        )));
    }
    Ok(())
}
