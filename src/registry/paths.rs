//! On-disk layout for the registry: where projects, tasks, repos, worktrees,
//! and logs live under the configured data directory.

use std::path::{Path, PathBuf};

/// Resolves every on-disk path the registry and its collaborators need,
/// rooted at the configured data directory.
#[derive(Debug, Clone)]
pub struct RegistryPaths {
    data_dir: PathBuf,
}

impl RegistryPaths {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn projects_file(&self) -> PathBuf {
        self.data_dir.join("projects.json")
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.data_dir.join("projects").join(project_id)
    }

    pub fn tasks_file(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("tasks.json")
    }

    pub fn repo_dir(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("repo")
    }

    pub fn worktrees_dir(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("worktrees")
    }

    pub fn worktree_dir(&self, project_id: &str, worker_id: &str) -> PathBuf {
        self.worktrees_dir(project_id).join(worker_id)
    }

    pub fn logs_dir(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("logs")
    }

    pub fn log_file(&self, project_id: &str, worker_id: &str) -> PathBuf {
        self.logs_dir(project_id).join(format!("{}.jsonl", worker_id))
    }
}
