//! Scheduler Loop: a single async dispatcher that claims tasks across every
//! ready project and runs each claimed task's full lifecycle concurrently.

mod experience;
mod git_lock;
mod lifecycle;

pub use git_lock::GitLocks;

use crate::config::Config;
use crate::events::EventLog;
use crate::registry::RegistryStore;
use crate::worker::WorkerPool;
use lifecycle::Lifecycle;
use std::sync::Arc;
use std::time::Duration;

/// Drives the claim/dispatch loop for as long as the process runs.
pub struct Scheduler {
    store: RegistryStore,
    pool: Arc<WorkerPool>,
    events: Arc<EventLog>,
    config: Arc<Config>,
    git_locks: Arc<GitLocks>,
}

impl Scheduler {
    pub fn new(store: RegistryStore, pool: Arc<WorkerPool>, events: Arc<EventLog>, config: Arc<Config>) -> Self {
        Self {
            store,
            pool,
            events,
            config,
            git_locks: Arc::new(GitLocks::new()),
        }
    }

    /// Run the dispatch loop forever. Never returns under normal operation;
    /// intended to be spawned as its own task inside the daemon's runtime.
    pub async fn run(&self) {
        loop {
            let Some(slot) = self.pool.idle_slot() else {
                tokio::time::sleep(Duration::from_secs(self.config.poll_idle_secs)).await;
                continue;
            };

            let claim = {
                let store = self.store.clone();
                let slot = slot.clone();
                tokio::task::spawn_blocking(move || store.claim_next(&slot)).await
            };

            let claimed = match claim {
                Ok(Ok(Some((project, task)))) => Some((project, task)),
                Ok(Ok(None)) => None,
                Ok(Err(e)) => {
                    self.events.push("scheduler", format!("claim_next failed: {}", e));
                    None
                }
                Err(e) => {
                    self.events.push("scheduler", format!("claim_next panicked: {}", e));
                    None
                }
            };

            let Some((project, task)) = claimed else {
                tokio::time::sleep(Duration::from_secs(self.config.poll_empty_secs)).await;
                continue;
            };

            let lifecycle = Lifecycle {
                store: self.store.clone(),
                pool: self.pool.clone(),
                events: self.events.clone(),
                config: self.config.clone(),
                git_locks: self.git_locks.clone(),
            };

            tokio::spawn(async move {
                lifecycle.run(slot, project.id.clone(), task).await;
            });

            tokio::time::sleep(Duration::from_secs(self.config.dispatch_pacing_secs)).await;
        }
    }
}
