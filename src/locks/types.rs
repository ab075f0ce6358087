//! Lock type definitions and information structures.

use super::metadata::LockMetadata;
use std::path::PathBuf;

/// Type of lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    /// Registry lock guarding `projects.json`.
    Registry,
    /// Per-project task-queue lock guarding `projects/<pid>/tasks.json`.
    TaskQueue,
}

impl LockType {
    /// Get a human-readable label for this lock type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Registry => "registry",
            LockType::TaskQueue => "task-queue",
        }
    }
}

/// Information about an active lock.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The lock name (e.g., "projects", "tasks").
    pub name: String,

    /// The lock type.
    pub lock_type: LockType,

    /// The lock metadata.
    pub metadata: LockMetadata,

    /// Whether the lock is stale.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, action: {}{})",
            self.name,
            self.metadata.owner,
            self.metadata.age_string(),
            self.metadata.action,
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}
