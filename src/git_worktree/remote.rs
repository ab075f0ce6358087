//! Remote operations for fetching and determining base SHA.

use crate::error::{CorralError, Result};
use crate::git::run_git;
use std::path::Path;

/// Fetch the main branch from the remote.
///
/// Runs `git fetch <remote> <main_branch>` to ensure we have the latest
/// remote state before determining base_sha.
///
/// # Arguments
///
/// * `repo_root` - Path to the repository root
/// * `remote` - Name of the remote (e.g., "origin")
/// * `main_branch` - Name of the main branch (e.g., "main")
///
/// # Returns
///
/// * `Ok(())` - Fetch succeeded
/// * `Err(CorralError::GitError)` - Fetch failed (exit code 3)
pub fn fetch_main<P: AsRef<Path>>(repo_root: P, remote: &str, main_branch: &str) -> Result<()> {
    let repo_root = repo_root.as_ref();

    // First check if the remote exists
    let remotes = run_git(repo_root, &["remote"])?;
    if !remotes.lines().contains(&remote) {
        return Err(CorralError::GitError(format!(
            "remote '{}' does not exist.\n\n\
             To fix this, either:\n\
             1. Set a different remote in config.yaml (remote: <name>)\n\
             2. Add the remote: git remote add {} <url>",
            remote, remote
        )));
    }

    run_git(repo_root, &["fetch", remote, main_branch]).map_err(|e| {
        CorralError::GitError(format!(
            "failed to fetch {}/{}: {}\n\n\
             Make sure the remote '{}' is accessible and the branch '{}' exists.",
            remote, main_branch, e, remote, main_branch
        ))
    })?;

    Ok(())
}

/// Get the base SHA for a task (the HEAD of remote/main).
///
/// This should be called after fetch_main to ensure we have the latest state.
///
/// # Arguments
///
/// * `repo_root` - Path to the repository root
/// * `remote` - Name of the remote (e.g., "origin")
/// * `main_branch` - Name of the main branch (e.g., "main")
///
/// # Returns
///
/// * `Ok(String)` - The full SHA of remote/main HEAD
/// * `Err(CorralError::GitError)` - Failed to resolve SHA (exit code 3)
pub fn get_base_sha<P: AsRef<Path>>(
    repo_root: P,
    remote: &str,
    main_branch: &str,
) -> Result<String> {
    let remote_ref = format!("{}/{}", remote, main_branch);

    let output = run_git(repo_root, &["rev-parse", &remote_ref]).map_err(|e| {
        CorralError::GitError(format!(
            "failed to resolve base SHA for '{}': {}\n\n\
             Make sure you have fetched from the remote first (git fetch {} {}).",
            remote_ref, e, remote, main_branch
        ))
    })?;

    Ok(output.stdout)
}

/// Resolve the base ref to branch a new worktree from.
///
/// Tries, in order: `origin/<base>`, `<base>`, then `HEAD`. This mirrors the
/// fallback chain a worktree controller needs when a project's declared base
/// branch may not have been fetched yet, or may only exist locally.
///
/// # Returns
///
/// The ref string that resolved (suitable for `git worktree add -b <branch> <worktree> <ref>`).
pub fn resolve_base_ref<P: AsRef<Path>>(repo_root: P, base: &str) -> Result<String> {
    let repo_root = repo_root.as_ref();

    let remote_ref = format!("origin/{}", base);
    if run_git(repo_root, &["rev-parse", "--verify", &remote_ref]).is_ok() {
        return Ok(remote_ref);
    }

    if run_git(repo_root, &["rev-parse", "--verify", base]).is_ok() {
        return Ok(base.to_string());
    }

    if run_git(repo_root, &["rev-parse", "--verify", "HEAD"]).is_ok() {
        return Ok("HEAD".to_string());
    }

    Err(CorralError::GitError(format!(
        "could not resolve base ref for '{}': none of origin/{}, {}, or HEAD exist",
        base, base, base
    )))
}
