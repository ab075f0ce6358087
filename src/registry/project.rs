//! Project model: a registered git repository under orchestrator management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a project's main working directory comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectSource {
    /// Cloned from a remote git URL.
    Remote { url: String },
    /// Symlinked from an existing local path.
    Local { path: String },
    /// Freshly initialized empty repository.
    New,
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Background clone/init/symlink setup is still running.
    Cloning,
    /// Setup succeeded; the project participates in scheduling.
    Ready,
    /// Setup failed; see `error`.
    Error,
}

/// A project registered with the orchestrator.
///
/// Identified by an opaque 8-character id, persisted in `projects.json`
/// alongside every other project. Only `ProjectStatus::Ready` projects are
/// considered by `claim_next`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub source: ProjectSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    pub base_branch: String,
    /// Name of the git remote used for fetch/push (e.g. "origin").
    #[serde(default = "default_remote_name")]
    pub remote_name: String,
    #[serde(default)]
    pub auto_merge: bool,
    #[serde(default)]
    pub auto_push: bool,
    /// Command run in the worktree after an agent finishes: expected to
    /// merge the task branch (or validate that it would) and run the
    /// project's test suite. Conventionally a script checked into the repo.
    #[serde(default = "default_merge_test_command")]
    pub merge_test_command: Vec<String>,
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_remote_name() -> String {
    "origin".to_string()
}

fn default_merge_test_command() -> Vec<String> {
    vec!["./merge_and_test.sh".to_string()]
}

impl Project {
    /// Whether this project currently participates in scheduling.
    pub fn is_ready(&self) -> bool {
        self.status == ProjectStatus::Ready
    }
}
