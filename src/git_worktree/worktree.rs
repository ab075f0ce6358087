//! Worktree creation, listing, and recreation operations.

use crate::error::{CorralError, Result};
use crate::git::run_git;
use std::path::{Path, PathBuf};

use super::branch::{branch_exists, delete_branch};
use super::cleanup::remove_worktree;
use super::remote::{fetch_main, resolve_base_ref};

/// Information about an existing worktree.
#[derive(Debug, Clone)]
pub struct ExistingWorktree {
    /// Path to the worktree.
    pub path: PathBuf,
    /// Branch the worktree is on.
    pub branch: Option<String>,
    /// HEAD commit SHA.
    pub head_sha: String,
}

/// Result of creating a task worktree.
#[derive(Debug, Clone)]
pub struct WorktreeInfo {
    /// Absolute path to the worktree directory.
    pub path: PathBuf,
    /// Name of the task branch.
    pub branch: String,
    /// The ref the branch was cut from (e.g. `origin/main`).
    pub base_ref: String,
}

/// Template injected into every freshly created task worktree.
const CLAUDE_MD_TEMPLATE: &str = "\
# Working in this worktree

You are working in an isolated git worktree created for a single task.
Commit your changes on this branch when the task is complete; do not
attempt to merge or push directly — the orchestrator handles that.
";

/// List all worktrees in the repository.
pub fn list_worktrees<P: AsRef<Path>>(repo_root: P) -> Result<Vec<ExistingWorktree>> {
    let output = run_git(repo_root, &["worktree", "list", "--porcelain"])?;

    let mut worktrees = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_head: Option<String> = None;
    let mut current_branch: Option<String> = None;

    for line in output.stdout.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let (Some(path), Some(head)) = (current_path.take(), current_head.take()) {
                worktrees.push(ExistingWorktree {
                    path,
                    branch: current_branch.take(),
                    head_sha: head,
                });
            }
            current_path = Some(PathBuf::from(path));
        } else if let Some(sha) = line.strip_prefix("HEAD ") {
            current_head = Some(sha.to_string());
        } else if let Some(branch_ref) = line.strip_prefix("branch ") {
            current_branch = branch_ref.strip_prefix("refs/heads/").map(String::from);
        } else if line == "detached" {
            current_branch = None;
        }
    }

    if let (Some(path), Some(head)) = (current_path, current_head) {
        worktrees.push(ExistingWorktree {
            path,
            branch: current_branch,
            head_sha: head,
        });
    }

    Ok(worktrees)
}

/// Find an existing worktree for a branch.
pub fn find_worktree_for_branch<P: AsRef<Path>>(
    repo_root: P,
    branch: &str,
) -> Result<Option<ExistingWorktree>> {
    let worktrees = list_worktrees(repo_root)?;
    Ok(worktrees
        .into_iter()
        .find(|wt| wt.branch.as_deref() == Some(branch)))
}

/// Add a worktree for an existing branch at `worktree_path`.
fn add_worktree<P: AsRef<Path>>(repo_root: P, worktree_path: &Path, branch: &str) -> Result<()> {
    let worktree_str = worktree_path.to_string_lossy();

    if let Some(parent) = worktree_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CorralError::GitError(format!(
                "failed to create worktrees directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    run_git(repo_root, &["worktree", "add", &worktree_str, branch]).map_err(|e| {
        CorralError::GitError(format!(
            "failed to create worktree at '{}' for branch '{}': {}",
            worktree_str, branch, e
        ))
    })?;

    Ok(())
}

/// Create a fresh worktree for a task branch, force-recreating any prior
/// state that might be left over from an earlier dispatch of the same task.
///
/// Algorithm (mirrors the scheduler's expectations exactly):
/// 1. Force-remove any worktree already checked out at `worktree_path`.
/// 2. `git fetch <remote>` (best-effort; failures are ignored).
/// 3. Resolve the base ref: `origin/<base>` -> `<base>` -> `HEAD`.
/// 4. Force-remove any other worktree currently holding `branch`.
/// 5. `git worktree prune`.
/// 6. Force-delete the local branch `branch` if it exists.
/// 7. `git worktree add -b <branch> <worktree_path> <base_ref>`.
/// 8. Write a `CLAUDE.md` into the new worktree and add it to the worktree's
///    `.git/info/exclude` so it never shows up as an untracked file to commit.
///
/// # Arguments
///
/// * `repo_root` - Path to the project's working clone.
/// * `worktree_path` - Absolute path the worktree should be created at.
/// * `branch` - Task branch name (e.g. `claude/<task_id>`).
/// * `remote` - Remote name to fetch from (e.g. `origin`).
/// * `base` - Base branch name declared by the project (e.g. `main`).
pub fn create_worktree<P: AsRef<Path>>(
    repo_root: P,
    worktree_path: &Path,
    branch: &str,
    remote: &str,
    base: &str,
) -> Result<WorktreeInfo> {
    let repo_root = repo_root.as_ref();

    if worktree_path.exists() {
        let _ = remove_worktree(repo_root, worktree_path, true);
        let _ = std::fs::remove_dir_all(worktree_path);
    }

    // Fetch is best-effort: a project with no configured remote, or a
    // transient network failure, should not block worktree creation when a
    // usable local base ref already exists.
    let _ = fetch_main(repo_root, remote, base);
    let base_ref = resolve_base_ref(repo_root, base)?;

    if let Some(existing) = find_worktree_for_branch(repo_root, branch)? {
        let _ = remove_worktree(repo_root, &existing.path, true);
    }

    let _ = run_git(repo_root, &["worktree", "prune"]);

    if branch_exists(repo_root, branch)? {
        delete_branch(repo_root, branch, true)?;
    }

    let worktree_str = worktree_path.to_string_lossy();
    if let Some(parent) = worktree_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CorralError::GitError(format!(
                "failed to create worktrees directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    run_git(
        repo_root,
        &["worktree", "add", "-b", branch, &worktree_str, &base_ref],
    )
    .map_err(|e| {
        CorralError::GitError(format!(
            "failed to create worktree at '{}' for branch '{}' from '{}': {}",
            worktree_str, branch, base_ref, e
        ))
    })?;

    inject_claude_md(worktree_path)?;

    Ok(WorktreeInfo {
        path: worktree_path.to_path_buf(),
        branch: branch.to_string(),
        base_ref,
    })
}

fn inject_claude_md(worktree_path: &Path) -> Result<()> {
    std::fs::write(worktree_path.join("CLAUDE.md"), CLAUDE_MD_TEMPLATE).map_err(|e| {
        CorralError::GitError(format!("failed to write CLAUDE.md into worktree: {}", e))
    })?;

    super::exclude::add_to_exclude(worktree_path, "CLAUDE.md")?;

    Ok(())
}
