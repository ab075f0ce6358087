//! Git worktree and task branch helpers for corral.
//!
//! This module provides the git operations behind a task's full lifecycle:
//!
//! - Force-creating an isolated worktree and branch for a claimed task
//! - Resolving the base ref to cut that branch from
//! - Verifying the worker actually committed something
//! - Merging a finished branch back onto its base, running the project's
//!   test command, and reporting the result
//! - Cleaning up worktrees (and, once merged, branches) when a task finishes
//!
//! All git failures are mapped to exit code 3 (CorralError::GitError).

mod branch;
mod cleanup;
pub mod exclude;
mod merge;
mod naming;
mod remote;
mod verification;
mod worktree;

// Re-export public API
pub use branch::{branch_exists, create_branch, delete_branch};
pub use cleanup::{cleanup_task_worktree, cleanup_worktree, remove_worktree};
pub use exclude::add_to_exclude;
pub use merge::{DEFAULT_MERGE_TEST_TIMEOUT, MergeOutcome, MergeTestOutcome, auto_merge, merge_and_test};
pub use naming::{task_branch_name, task_id_from_branch};
pub use remote::{fetch_main, get_base_sha, resolve_base_ref};
pub use verification::{commits_ahead, get_current_branch, verify_commit, verify_worktree_branch};
pub use worktree::{ExistingWorktree, WorktreeInfo, create_worktree, find_worktree_for_branch, list_worktrees};
