//! Startup recovery: re-establishes a clean state after an unclean shutdown.
//!
//! Interrupted tasks are reset rather than resumed, and their worktrees and
//! branches are reclaimed. No attempt is made to recover partial agent work;
//! the next claim starts the task over from scratch.

use crate::error::Result;
use crate::events::EventLog;
use crate::registry::{RegistryStore, TaskStatus, TaskStatusUpdate};
use std::process::Command;

const BRANCH_PREFIX: &str = "claude/";

/// Reset any task left in an in-flight status back to `pending`, clearing
/// `worker_id` and `error`. `merge_pending` is left untouched — it is a
/// stable state awaiting an operator decision, not an interrupted one.
fn reset_stale_tasks(store: &RegistryStore) -> Result<usize> {
    let mut reset_count = 0;
    for project in store.list_projects()? {
        for task in store.list_tasks(&project.id)? {
            if matches!(
                task.status,
                TaskStatus::Claimed | TaskStatus::Running | TaskStatus::Merging | TaskStatus::Testing
            ) {
                let update = TaskStatusUpdate::new()
                    .status(TaskStatus::Pending)
                    .worker_id(None)
                    .error(None);
                store.update_task_status(&project.id, &task.id, update)?;
                reset_count += 1;
            }
        }
    }
    Ok(reset_count)
}

/// For every project with a repo directory present, force-remove every
/// worktree, prune stale metadata, and delete every local `claude/*` branch.
fn reclaim_worktrees_and_branches(store: &RegistryStore) -> Result<usize> {
    let mut reclaimed = 0;
    for project in store.list_projects()? {
        let repo_dir = store.paths().repo_dir(&project.id);
        if !repo_dir.join(".git").exists() {
            continue;
        }

        let worktrees_dir = store.paths().worktrees_dir(&project.id);
        if let Ok(entries) = std::fs::read_dir(&worktrees_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let _ = Command::new("git")
                    .args(["worktree", "remove", "--force"])
                    .arg(&path)
                    .current_dir(&repo_dir)
                    .output();
                let _ = std::fs::remove_dir_all(&path);
                reclaimed += 1;
            }
        }

        let _ = Command::new("git").args(["worktree", "prune"]).current_dir(&repo_dir).output();

        if let Ok(output) = Command::new("git")
            .args(["branch", "--list", &format!("{}*", BRANCH_PREFIX)])
            .current_dir(&repo_dir)
            .output()
        {
            let listing = String::from_utf8_lossy(&output.stdout);
            for line in listing.lines() {
                let branch = line.trim().trim_start_matches("* ").trim();
                if branch.starts_with(BRANCH_PREFIX) {
                    let _ = Command::new("git")
                        .args(["branch", "-D", branch])
                        .current_dir(&repo_dir)
                        .output();
                }
            }
        }
    }
    Ok(reclaimed)
}

/// Run the full startup recovery pass: reset stale tasks, reclaim orphan
/// worktrees and branches, and emit a summary event. Must complete before
/// the callback receiver reports healthy.
pub fn run(store: &RegistryStore, events: &EventLog) -> Result<()> {
    let reset_count = reset_stale_tasks(store)?;
    let reclaimed = reclaim_worktrees_and_branches(store)?;

    let summary = format!(
        "recovery: reset {} in-flight task(s), reclaimed {} worktree(s)",
        reset_count, reclaimed
    );
    tracing::info!(reset_count, reclaimed, "startup recovery complete");
    events.push("recovery", summary);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Project, ProjectSource, ProjectStatus, Task};
    use chrono::Utc;
    use tempfile::TempDir;

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
            worker_id: Some("worker-1".to_string()),
            branch: Some("claude/task0001".to_string()),
            commit_id: None,
            error: None,
            status,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[test]
    fn resets_in_flight_tasks_but_not_merge_pending() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path());
        store.create_project(project("proj0001")).unwrap();
        store.create_task("proj0001", task("task0001", "proj0001", TaskStatus::Running)).unwrap();
        store.create_task("proj0001", task("task0002", "proj0001", TaskStatus::MergePending)).unwrap();

        let events = EventLog::new(10);
        run(&store, &events).unwrap();

        let t1 = store.get_task("proj0001", "task0001").unwrap().unwrap();
        assert_eq!(t1.status, TaskStatus::Pending);
        assert!(t1.worker_id.is_none());

        let t2 = store.get_task("proj0001", "task0002").unwrap().unwrap();
        assert_eq!(t2.status, TaskStatus::MergePending);

        let snapshot = events.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].message.contains("reset 1"));
    }

    #[test]
    fn recovery_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path());
        store.create_project(project("proj0001")).unwrap();
        store.create_task("proj0001", task("task0001", "proj0001", TaskStatus::Claimed)).unwrap();

        let events = EventLog::new(10);
        run(&store, &events).unwrap();
        run(&store, &events).unwrap();

        let t1 = store.get_task("proj0001", "task0001").unwrap().unwrap();
        assert_eq!(t1.status, TaskStatus::Pending);
    }
}
