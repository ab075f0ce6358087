//! Durable, lock-protected persistence of projects and task queues.
//!
//! Every mutating operation follows a read-lock-modify-write pattern under
//! the relevant file lock (registry lock for `projects.json`, per-project
//! task-queue lock for `projects/<pid>/tasks.json>`), with a 10-second
//! acquisition timeout. Reads acquire the same lock to observe a consistent
//! snapshot. Writes serialize the full model to JSON (struct field order is
//! stable) and atomically replace the file.

use super::claim::{ClaimCandidate, pick_winner};
use super::paths::RegistryPaths;
use super::project::Project;
use super::task::{Task, TaskStatus, TaskStatusUpdate};
use crate::error::{CorralError, Result};
use crate::fs::atomic_write;
use crate::locks::{acquire_path_lock, lock_path_for};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TasksFile {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Handle to the on-disk registry rooted at a configured data directory.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    paths: RegistryPaths,
}

impl RegistryStore {
    pub fn new<P: Into<std::path::PathBuf>>(data_dir: P) -> Self {
        Self {
            paths: RegistryPaths::new(data_dir),
        }
    }

    pub fn paths(&self) -> &RegistryPaths {
        &self.paths
    }

    // -- projects ---------------------------------------------------------

    fn read_projects_file(&self) -> Result<ProjectsFile> {
        let path = self.paths.projects_file();
        if !path.exists() {
            return Ok(ProjectsFile::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            CorralError::RegistryError(format!("failed to read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CorralError::RegistryError(format!("corrupt projects registry '{}': {}", path.display(), e))
        })
    }

    fn write_projects_file(&self, file: &ProjectsFile) -> Result<()> {
        let path = self.paths.projects_file();
        let json = serde_json::to_string_pretty(file).map_err(|e| {
            CorralError::RegistryError(format!("failed to serialize projects registry: {}", e))
        })?;
        atomic_write(&path, json.as_bytes())
    }

    /// List all projects under the registry lock (consistent snapshot).
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let lock_path = lock_path_for(&self.paths.projects_file());
        let _guard = acquire_path_lock(&lock_path, "list_projects")?;
        Ok(self.read_projects_file()?.projects)
    }

    /// List only projects currently in `Ready` status.
    pub fn list_ready_projects(&self) -> Result<Vec<Project>> {
        Ok(self.list_projects()?.into_iter().filter(|p| p.is_ready()).collect())
    }

    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(self.list_projects()?.into_iter().find(|p| p.id == project_id))
    }

    /// Insert a new project. Fails if the id already exists.
    pub fn create_project(&self, project: Project) -> Result<()> {
        let lock_path = lock_path_for(&self.paths.projects_file());
        let _guard = acquire_path_lock(&lock_path, "create_project")?;
        let mut file = self.read_projects_file()?;
        if file.projects.iter().any(|p| p.id == project.id) {
            return Err(CorralError::RegistryError(format!(
                "project '{}' already exists",
                project.id
            )));
        }
        file.projects.push(project);
        self.write_projects_file(&file)?;
        Ok(())
    }

    /// Apply `mutate` to the named project under the registry lock and persist.
    pub fn update_project<F>(&self, project_id: &str, mutate: F) -> Result<Project>
    where
        F: FnOnce(&mut Project),
    {
        let lock_path = lock_path_for(&self.paths.projects_file());
        let _guard = acquire_path_lock(&lock_path, "update_project")?;
        let mut file = self.read_projects_file()?;
        let project = file
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| CorralError::RegistryError(format!("project '{}' not found", project_id)))?;
        mutate(project);
        let updated = project.clone();
        self.write_projects_file(&file)?;
        Ok(updated)
    }

    /// Remove a project from the registry (permitted in any status) and
    /// best-effort delete its on-disk directory.
    pub fn delete_project(&self, project_id: &str) -> Result<()> {
        let lock_path = lock_path_for(&self.paths.projects_file());
        let _guard = acquire_path_lock(&lock_path, "delete_project")?;
        let mut file = self.read_projects_file()?;
        let before = file.projects.len();
        file.projects.retain(|p| p.id != project_id);
        if file.projects.len() == before {
            return Err(CorralError::RegistryError(format!("project '{}' not found", project_id)));
        }
        self.write_projects_file(&file)?;
        drop(_guard);
        let _ = fs::remove_dir_all(self.paths.project_dir(project_id));
        Ok(())
    }

    // -- tasks --------------------------------------------------------------

    fn read_tasks_file(&self, project_id: &str) -> Result<TasksFile> {
        let path = self.paths.tasks_file(project_id);
        if !path.exists() {
            return Ok(TasksFile::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            CorralError::RegistryError(format!("failed to read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CorralError::RegistryError(format!("corrupt task queue '{}': {}", path.display(), e))
        })
    }

    fn write_tasks_file(&self, project_id: &str, file: &TasksFile) -> Result<()> {
        let path = self.paths.tasks_file(project_id);
        let json = serde_json::to_string_pretty(file).map_err(|e| {
            CorralError::RegistryError(format!("failed to serialize task queue: {}", e))
        })?;
        atomic_write(&path, json.as_bytes())
    }

    pub fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        let lock_path = lock_path_for(&self.paths.tasks_file(project_id));
        let _guard = acquire_path_lock(&lock_path, "list_tasks")?;
        Ok(self.read_tasks_file(project_id)?.tasks)
    }

    pub fn get_task(&self, project_id: &str, task_id: &str) -> Result<Option<Task>> {
        Ok(self.list_tasks(project_id)?.into_iter().find(|t| t.id == task_id))
    }

    pub fn create_task(&self, project_id: &str, task: Task) -> Result<()> {
        let lock_path = lock_path_for(&self.paths.tasks_file(project_id));
        let _guard = acquire_path_lock(&lock_path, "create_task")?;
        let mut file = self.read_tasks_file(project_id)?;
        if file.tasks.iter().any(|t| t.id == task.id) {
            return Err(CorralError::RegistryError(format!("task '{}' already exists", task.id)));
        }
        file.tasks.push(task);
        self.write_tasks_file(project_id, &file)
    }

    /// Apply a partial update to a task. Never transitions a task away from
    /// a terminal status. Setting `status` to `Completed` stamps `completed_at`.
    pub fn update_task_status(
        &self,
        project_id: &str,
        task_id: &str,
        update: TaskStatusUpdate,
    ) -> Result<Task> {
        let lock_path = lock_path_for(&self.paths.tasks_file(project_id));
        let _guard = acquire_path_lock(&lock_path, "update_task_status")?;
        let mut file = self.read_tasks_file(project_id)?;
        let task = file
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| CorralError::RegistryError(format!("task '{}' not found", task_id)))?;

        if task.status.is_terminal() {
            return Err(CorralError::RegistryError(format!(
                "task '{}' is in terminal status {:?} and cannot be updated",
                task_id, task.status
            )));
        }

        apply_update(task, update);
        let updated = task.clone();
        self.write_tasks_file(project_id, &file)?;
        Ok(updated)
    }

    /// Force-apply a partial update even to a terminal task. Used by `retry`,
    /// which is the one operation explicitly allowed to leave a terminal status.
    pub fn force_update_task(
        &self,
        project_id: &str,
        task_id: &str,
        update: TaskStatusUpdate,
    ) -> Result<Task> {
        let lock_path = lock_path_for(&self.paths.tasks_file(project_id));
        let _guard = acquire_path_lock(&lock_path, "force_update_task")?;
        let mut file = self.read_tasks_file(project_id)?;
        let task = file
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| CorralError::RegistryError(format!("task '{}' not found", task_id)))?;
        apply_update(task, update);
        let updated = task.clone();
        self.write_tasks_file(project_id, &file)?;
        Ok(updated)
    }

    /// Atomically claim the best pending task across all ready projects.
    ///
    /// Two-phase: snapshot every ready project's candidates without holding
    /// every task-queue lock at once, pick a winner, then re-acquire that
    /// project's lock and re-verify before committing the claim. If the
    /// candidate changed underneath us, returns `Ok(None)` for this round;
    /// the scheduler retries on its next tick.
    pub fn claim_next(&self, worker_id: &str) -> Result<Option<(Project, Task)>> {
        let ready_projects = self.list_ready_projects()?;

        let mut candidates = Vec::new();
        for project in &ready_projects {
            let tasks = match self.list_tasks(&project.id) {
                Ok(t) => t,
                Err(_) => continue,
            };
            for task in &tasks {
                if !task.status.is_claimable() {
                    continue;
                }
                if let Some(dep_id) = &task.depends_on {
                    let dep_done = tasks
                        .iter()
                        .any(|t| &t.id == dep_id && t.status == TaskStatus::Completed);
                    if !dep_done {
                        continue;
                    }
                }
                candidates.push(ClaimCandidate {
                    project: project.clone(),
                    task: task.clone(),
                });
            }
        }

        let Some(winner) = pick_winner(candidates) else {
            return Ok(None);
        };

        let lock_path = lock_path_for(&self.paths.tasks_file(&winner.project.id));
        let _guard = acquire_path_lock(&lock_path, "claim_next")?;
        let mut file = self.read_tasks_file(&winner.project.id)?;
        let Some(task) = file.tasks.iter_mut().find(|t| t.id == winner.task.id) else {
            return Ok(None);
        };
        if !task.status.is_claimable() || task.status != winner.task.status {
            return Ok(None);
        }

        task.status = TaskStatus::Claimed;
        task.worker_id = Some(worker_id.to_string());
        task.started_at = Some(Utc::now());
        task.error = None;
        let claimed = task.clone();
        self.write_tasks_file(&winner.project.id, &file)?;

        Ok(Some((winner.project, claimed)))
    }
}

fn apply_update(task: &mut Task, update: TaskStatusUpdate) {
    if let Some(status) = update.status {
        task.status = status;
        if status == TaskStatus::Completed {
            task.completed_at = Some(Utc::now());
        }
    }
    if let Some(error) = update.error {
        task.error = error;
    }
    if let Some(commit_id) = update.commit_id {
        task.commit_id = commit_id;
    }
    if let Some(plan) = update.plan {
        task.plan = plan;
    }
    if let Some(branch) = update.branch {
        task.branch = branch;
    }
    if let Some(plan_messages) = update.plan_messages {
        task.plan_messages = plan_messages;
    }
    if let Some(plan_session_id) = update.plan_session_id {
        task.plan_session_id = plan_session_id;
    }
    if let Some(plan_answers) = update.plan_answers {
        task.plan_answers = plan_answers;
    }
    if let Some(depends_on) = update.depends_on {
        task.depends_on = depends_on;
    }
    if let Some(worker_id) = update.worker_id {
        task.worker_id = worker_id;
    }
    if let Some(started_at) = update.started_at {
        task.started_at = started_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::project::{ProjectSource, ProjectStatus};
    use tempfile::TempDir;

    fn store() -> (TempDir, RegistryStore) {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path());
        (dir, store)
    }

    fn make_project(id: &str) -> Project {
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

    fn make_task(project_id: &str, id: &str, priority: i64) -> Task {
        Task {
            id: id.to_string(),
            project_id: project_id.to_string(),
            title: "demo task".to_string(),
            description: "demo task".to_string(),
            priority,
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
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn round_trips_project_registry() {
        let (_dir, store) = store();
        store.create_project(make_project("proj0001")).unwrap();
        let loaded = store.get_project("proj0001").unwrap().unwrap();
        assert_eq!(loaded.id, "proj0001");
        assert_eq!(loaded.status, ProjectStatus::Ready);
    }

    #[test]
    fn claim_next_returns_none_with_no_ready_projects() {
        let (_dir, store) = store();
        assert!(store.claim_next("worker-1").unwrap().is_none());
    }

    #[test]
    fn claim_next_prefers_higher_priority() {
        let (_dir, store) = store();
        store.create_project(make_project("proj0001")).unwrap();
        store.create_task("proj0001", make_task("proj0001", "task0001", 0)).unwrap();
        store.create_task("proj0001", make_task("proj0001", "task0002", 10)).unwrap();

        let (_project, task) = store.claim_next("worker-1").unwrap().unwrap();
        assert_eq!(task.id, "task0002");
        assert_eq!(task.status, TaskStatus::Claimed);
        assert_eq!(task.worker_id.as_deref(), Some("worker-1"));
    }

    #[test]
    fn claim_next_respects_dependency() {
        let (_dir, store) = store();
        store.create_project(make_project("proj0001")).unwrap();
        let mut dependent = make_task("proj0001", "task0002", 10);
        dependent.depends_on = Some("task0001".to_string());
        store.create_task("proj0001", make_task("proj0001", "task0001", 0)).unwrap();
        store.create_task("proj0001", dependent).unwrap();

        let (_project, task) = store.claim_next("worker-1").unwrap().unwrap();
        assert_eq!(task.id, "task0001", "dependent task must not be claimed before its dependency");
    }

    #[test]
    fn update_task_status_rejects_terminal_transition() {
        let (_dir, store) = store();
        store.create_project(make_project("proj0001")).unwrap();
        let mut task = make_task("proj0001", "task0001", 0);
        task.status = TaskStatus::Completed;
        store.create_task("proj0001", task).unwrap();

        let result = store.update_task_status(
            "proj0001",
            "task0001",
            TaskStatusUpdate::new().status(TaskStatus::Pending),
        );
        assert!(result.is_err());
    }
}
