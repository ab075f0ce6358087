//! Administrative task operations: cancel and retry.
//!
//! These are plain functions rather than a long-lived service because the
//! operator-facing surface is the `corral` CLI, not a second HTTP listener:
//! every mutation goes straight through the same [`RegistryStore`] the
//! scheduler and callback receiver use, guarded by the same per-project
//! locks. Stopping a *running* task's container does not need the daemon's
//! in-memory `WorkerPool` either — the container name is derived
//! deterministically from the task's recorded `worker_id`
//! (`corral-<worker_id>`), so `docker stop` can be issued directly from
//! whatever process the operator is running the CLI in. The live daemon's
//! own `wait_container` call then unblocks on its own and reconciles the
//! slot back to idle; see `scheduler::lifecycle`.

use crate::error::{CorralError, Result};
use crate::registry::{RegistryStore, Task, TaskStatus, TaskStatusUpdate};
use crate::worker::{container_name, stop_container};
use std::time::Duration;

/// Cancel a task. Permitted from the direct-cancellable set (pending,
/// plan_pending, plan_approved, failed) and the running-cancellable set
/// (claimed, running, merging, testing); anything else is rejected.
pub fn cancel_task(
    store: &RegistryStore,
    project_id: &str,
    task_id: &str,
    container_stop_grace: Duration,
) -> Result<Task> {
    let task = store
        .get_task(project_id, task_id)?
        .ok_or_else(|| CorralError::RegistryError(format!("task '{}' not found", task_id)))?;

    if task.status.is_direct_cancellable() {
        let update = TaskStatusUpdate::new().status(TaskStatus::Cancelled);
        return store.update_task_status(project_id, task_id, update);
    }

    if task.status.is_running_class() {
        if let Some(worker_id) = &task.worker_id {
            stop_container(&container_name(worker_id), container_stop_grace);
        }
        let update = TaskStatusUpdate::new().status(TaskStatus::Cancelled).worker_id(None);
        return store.update_task_status(project_id, task_id, update);
    }

    Err(CorralError::UserError(format!(
        "task '{}' cannot be cancelled from status {:?}",
        task_id, task.status
    )))
}

/// Retry a terminal (or plan_pending) task: plan-mode tasks re-enter
/// `plan_pending`, others re-enter `pending`, with `error` cleared. Unlike
/// `update_task_status`, this is explicitly allowed to move a task away
/// from a terminal status.
pub fn retry_task(store: &RegistryStore, project_id: &str, task_id: &str) -> Result<Task> {
    let task = store
        .get_task(project_id, task_id)?
        .ok_or_else(|| CorralError::RegistryError(format!("task '{}' not found", task_id)))?;

    if !task.status.is_retryable() {
        return Err(CorralError::UserError(format!(
            "task '{}' cannot be retried from status {:?}",
            task_id, task.status
        )));
    }

    let next_status = if task.plan_mode { TaskStatus::PlanPending } else { TaskStatus::Pending };
    let update = TaskStatusUpdate::new().status(next_status).error(None).worker_id(None);
    store.force_update_task(project_id, task_id, update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Project, ProjectSource, ProjectStatus};
    use chrono::Utc;
    use tempfile::TempDir;

    fn store() -> (TempDir, RegistryStore) {
        let dir = TempDir::new().unwrap();
        (dir, RegistryStore::new(dir.path()))
    }

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            name: "demo".to_string(),
            source: ProjectSource::New,
            remote_url: None,
            base_branch: "main".to_string(),
            remote_name: "origin".to_string(),
            auto_merge: false,
            auto_push: false,
            merge_test_command: vec!["./merge_and_test.sh".to_string()],
            status: ProjectStatus::Ready,
            error: None,
            created_at: Utc::now(),
        }
    }

    fn task(id: &str, project_id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            project_id: project_id.to_string(),
            title: "demo".to_string(),
            description: "demo".to_string(),
            priority: 0,
            depends_on: None,
            plan_mode: false,
            plan: None,
            plan_session_id: None,
            plan_answers: Default::default(),
            plan_messages: Vec::new(),
            worker_id: None,
            branch: None,
            commit_id: None,
            error: None,
            status,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn cancel_pending_task_directly() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        store.create_task("proj0001", task("task0001", "proj0001", TaskStatus::Pending)).unwrap();

        let updated = cancel_task(&store, "proj0001", "task0001", Duration::from_secs(1)).unwrap();
        assert_eq!(updated.status, TaskStatus::Cancelled);
    }

    #[test]
    fn cancel_running_task_clears_worker_id() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        let mut t = task("task0001", "proj0001", TaskStatus::Running);
        t.worker_id = Some("worker-1".to_string());
        store.create_task("proj0001", t).unwrap();

        let updated = cancel_task(&store, "proj0001", "task0001", Duration::from_millis(1)).unwrap();
        assert_eq!(updated.status, TaskStatus::Cancelled);
        assert!(updated.worker_id.is_none());
    }

    #[test]
    fn cancel_completed_task_rejected() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        store.create_task("proj0001", task("task0001", "proj0001", TaskStatus::Completed)).unwrap();

        let err = cancel_task(&store, "proj0001", "task0001", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, CorralError::UserError(_)));
    }

    #[test]
    fn retry_failed_task_reenters_pending() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        let mut t = task("task0001", "proj0001", TaskStatus::Failed);
        t.error = Some("boom".to_string());
        store.create_task("proj0001", t).unwrap();

        let updated = retry_task(&store, "proj0001", "task0001").unwrap();
        assert_eq!(updated.status, TaskStatus::Pending);
        assert!(updated.error.is_none());
    }

    #[test]
    fn retry_plan_mode_task_reenters_plan_pending() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        let mut t = task("task0001", "proj0001", TaskStatus::Cancelled);
        t.plan_mode = true;
        store.create_task("proj0001", t).unwrap();

        let updated = retry_task(&store, "proj0001", "task0001").unwrap();
        assert_eq!(updated.status, TaskStatus::PlanPending);
    }

    #[test]
    fn retry_running_task_rejected() {
        let (_dir, store) = store();
        store.create_project(project("proj0001")).unwrap();
        store.create_task("proj0001", task("task0001", "proj0001", TaskStatus::Running)).unwrap();

        let err = retry_task(&store, "proj0001", "task0001").unwrap_err();
        assert!(matches!(err, CorralError::UserError(_)));
    }
}
