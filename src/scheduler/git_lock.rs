//! Per-project in-process git lock.
//!
//! All git operations touching a project's shared main repo (merge-and-test,
//! auto-merge, branch cleanup) are serialized by a `tokio::sync::Mutex` keyed
//! on project id. Worktrees are independent working trees and do not need
//! this lock while an agent is running in one.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct GitLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the mutex for a project id.
    pub async fn for_project(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
