//! Shared helper for adding an entry to a worktree's `info/exclude` file.
//!
//! A linked worktree's `<worktree>/.git` is a file pointing at the real git
//! directory under the main repo's `.git/worktrees/<name>/`, not a
//! directory — `info/exclude` lives there, not under `<worktree>/.git/`.
//! Resolving the real git dir via `git rev-parse --git-dir` before writing
//! is required for this to have any effect in a worktree.

use crate::error::Result;
use crate::git::resolve_git_dir;
use std::path::Path;

/// Add `entry` to `cwd`'s git-exclude file (`<git-dir>/info/exclude`),
/// resolving the real git directory first so this works from both the main
/// repo and a linked worktree. Idempotent: does nothing if already present.
pub fn add_to_exclude(cwd: &Path, entry: &str) -> Result<()> {
    let git_dir = resolve_git_dir(cwd)?;
    let info_dir = git_dir.join("info");
    std::fs::create_dir_all(&info_dir).map_err(|e| {
        crate::error::CorralError::GitError(format!(
            "failed to create '{}': {}",
            info_dir.display(),
            e
        ))
    })?;

    let exclude_path = info_dir.join("exclude");
    let mut existing = std::fs::read_to_string(&exclude_path).unwrap_or_default();
    if existing.lines().any(|l| l == entry) {
        return Ok(());
    }
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    existing.push_str(entry);
    existing.push('\n');

    std::fs::write(&exclude_path, existing).map_err(|e| {
        crate::error::CorralError::GitError(format!(
            "failed to write '{}': {}",
            exclude_path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;
    use crate::git::run_git;

    #[test]
    fn excludes_entry_in_main_repo() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();

        add_to_exclude(path, "CLAUDE.md").unwrap();

        let exclude = std::fs::read_to_string(path.join(".git").join("info").join("exclude")).unwrap();
        assert!(exclude.lines().any(|l| l == "CLAUDE.md"));
    }

    #[test]
    fn excludes_entry_in_linked_worktree() {
        let temp_dir = create_test_repo();
        let repo = temp_dir.path();
        run_git(repo, &["branch", "feature"]).unwrap();
        let worktree_path = repo.join("wt");
        run_git(repo, &["worktree", "add", worktree_path.to_str().unwrap(), "feature"]).unwrap();

        assert!(worktree_path.join(".git").is_file());

        add_to_exclude(&worktree_path, "CLAUDE.md").unwrap();

        let git_dir = resolve_git_dir(&worktree_path).unwrap();
        let exclude = std::fs::read_to_string(git_dir.join("info").join("exclude")).unwrap();
        assert!(exclude.lines().any(|l| l == "CLAUDE.md"));
    }

    #[test]
    fn is_idempotent() {
        let temp_dir = create_test_repo();
        let path = temp_dir.path();

        add_to_exclude(path, "CLAUDE.md").unwrap();
        add_to_exclude(path, "CLAUDE.md").unwrap();

        let exclude = std::fs::read_to_string(path.join(".git").join("info").join("exclude")).unwrap();
        assert_eq!(exclude.lines().filter(|l| *l == "CLAUDE.md").count(), 1);
    }
}
