//! Worker Pool: a fixed set of slots tracking one container's lifecycle each.

use super::container::{self, ContainerExit, RunContainerSpec};
use super::slot::{WorkerSlot, WorkerStatus, container_name, slot_id};
use crate::error::{CorralError, Result};
use crate::registry::{Project, Task};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Naming prefix shared by every container this daemon instance launches, so
/// a restart can recognize and forcibly remove its own leftovers.
const CONTAINER_PREFIX: &str = "corral-worker-";

/// Fixed pool of `worker_count` slots, created at startup and never destroyed.
#[derive(Debug)]
pub struct WorkerPool {
    slots: Mutex<HashMap<String, WorkerSlot>>,
    container_wait_timeout: Duration,
    container_stop_grace: Duration,
}

impl WorkerPool {
    /// Build the pool with `worker_count` idle slots. Forcibly removes any
    /// leftover containers from a prior run that match this daemon's naming
    /// prefix before the first task is ever dispatched.
    pub fn new(worker_count: u32, container_wait_timeout: Duration, container_stop_grace: Duration) -> Self {
        for name in container::list_names_with_prefix(CONTAINER_PREFIX) {
            container::force_remove(&name);
        }

        let mut slots = HashMap::new();
        for i in 1..=worker_count {
            let id = slot_id(i);
            slots.insert(id.clone(), WorkerSlot::new(id));
        }

        Self {
            slots: Mutex::new(slots),
            container_wait_timeout,
            container_stop_grace,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, WorkerSlot>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Id of the first idle slot, if any.
    pub fn idle_slot(&self) -> Option<String> {
        self.lock()
            .values()
            .filter(|s| s.is_idle())
            .min_by(|a, b| a.id.cmp(&b.id))
            .map(|s| s.id.clone())
    }

    pub fn list_slots(&self) -> Vec<WorkerSlot> {
        let mut slots: Vec<_> = self.lock().values().cloned().collect();
        slots.sort_by(|a, b| a.id.cmp(&b.id));
        slots
    }

    /// Launch a detached container for `task` in `slot`, mounting the task's
    /// worktree, log directory, and the project's repo directory (at the
    /// same absolute path, since the worktree's git metadata points back
    /// into the repo's internal worktree bookkeeping). Transitions the slot
    /// to `busy` on success.
    #[allow(clippy::too_many_arguments)]
    pub fn run_task(
        &self,
        slot: &str,
        project: &Project,
        task: &Task,
        worktree_path: &Path,
        repo_path: &Path,
        log_dir: &Path,
        branch_name: &str,
        worker_image: &str,
        manager_url: &str,
        docker_network: Option<&str>,
        forwarded_env: &[(String, String)],
    ) -> Result<String> {
        if !worktree_path.join(".git").exists() {
            return Err(CorralError::ContainerError(format!(
                "worktree '{}' does not exist or has no git metadata",
                worktree_path.display()
            )));
        }

        let name = container_name(slot);
        container::force_remove(&name);

        let repo_path_str = repo_path.to_string_lossy().to_string();
        let mut env = vec![
            ("TASK_ID".to_string(), task.id.clone()),
            ("TASK_TITLE".to_string(), task.title.clone()),
            ("TASK_DESC".to_string(), task.description.clone()),
            ("PROJECT_ID".to_string(), project.id.clone()),
            ("PROJECT_NAME".to_string(), project.name.clone()),
            ("WORKER_ID".to_string(), slot.to_string()),
            ("MANAGER_URL".to_string(), manager_url.to_string()),
            ("BRANCH_NAME".to_string(), branch_name.to_string()),
        ];
        if let Some(plan) = &task.plan {
            env.push(("TASK_PLAN".to_string(), plan.clone()));
        }
        env.extend(forwarded_env.iter().cloned());

        let spec = RunContainerSpec {
            name: &name,
            image: worker_image,
            workspace_mount: &worktree_path.to_string_lossy(),
            logs_mount: &log_dir.to_string_lossy(),
            repo_mount: &repo_path_str,
            docker_network,
            env,
        };

        let container_id = container::run_container(&spec)?;

        let mut slots = self.lock();
        if let Some(s) = slots.get_mut(slot) {
            s.status = WorkerStatus::Busy;
            s.container_id = Some(container_id.clone());
            s.task_id = Some(task.id.clone());
            s.last_activity = Utc::now();
        }
        Ok(container_id)
    }

    /// Block (on the caller's thread, meant to be run via `spawn_blocking`)
    /// until the slot's container exits.
    pub fn wait_container(&self, container_id: &str) -> ContainerExit {
        container::wait_container(container_id, self.container_wait_timeout)
    }

    /// Return a slot to `idle`, clearing its container/task and bumping its
    /// completed count.
    pub fn mark_idle(&self, slot: &str) {
        let mut slots = self.lock();
        if let Some(s) = slots.get_mut(slot) {
            s.status = WorkerStatus::Idle;
            s.container_id = None;
            s.task_id = None;
            s.completed_count += 1;
            s.last_activity = Utc::now();
        }
    }

    /// Stop a running slot's container (graceful, then forced) and mark it
    /// idle. Used for task cancellation.
    pub fn stop_worker(&self, slot: &str) {
        let container_id = {
            let slots = self.lock();
            slots.get(slot).and_then(|s| s.container_id.clone())
        };
        if let Some(container_id) = container_id {
            container::stop_container(&container_id, self.container_stop_grace);
        }
        self.mark_idle(slot);
    }

    /// Reconcile slot fields against the current task list so a restart
    /// recovers displayed state without depending on live container events.
    /// Any slot whose recorded task is no longer in a running-class status
    /// is released back to idle.
    pub fn update_from_tasks(&self, tasks: &[Task]) {
        let mut slots = self.lock();
        for slot in slots.values_mut() {
            let Some(task_id) = &slot.task_id else { continue };
            let still_active = tasks
                .iter()
                .any(|t| &t.id == task_id && t.status.is_running_class());
            if !still_active {
                slot.status = WorkerStatus::Idle;
                slot.container_id = None;
                slot.task_id = None;
            }
        }
        for task in tasks {
            if let Some(worker_id) = &task.worker_id {
                if task.status.is_running_class() {
                    if let Some(slot) = slots.get_mut(worker_id) {
                        slot.status = WorkerStatus::Busy;
                        slot.task_id = Some(task.id.clone());
                    }
                }
            }
        }
    }
}
