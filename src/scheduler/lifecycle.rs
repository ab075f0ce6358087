//! `task_lifecycle`: the full claim-to-release pipeline for one task,
//! run as its own concurrently spawned future per active task.

use super::experience::{fetch_cross_project_experience, invoke_experience_hook};
use super::git_lock::GitLocks;
use crate::config::Config;
use crate::events::EventLog;
use crate::git_worktree::{
    MergeOutcome, auto_merge, cleanup_worktree, commits_ahead, create_worktree, merge_and_test, task_branch_name,
};
use crate::registry::{Project, RegistryStore, Task, TaskStatus, TaskStatusUpdate};
use crate::worker::WorkerPool;
use std::sync::Arc;
use std::time::Duration;

const EXPERIENCE_TAIL_LINES: usize = 50;
const EXPERIENCE_TAIL_MAX_CHARS: usize = 6000;

pub struct Lifecycle {
    pub store: RegistryStore,
    pub pool: Arc<WorkerPool>,
    pub events: Arc<EventLog>,
    pub config: Arc<Config>,
    pub git_locks: Arc<GitLocks>,
}

impl Lifecycle {
    /// Run one task end to end. `slot` and `task` come from a successful
    /// `claim_next`; `project` is reloaded fresh in case it changed since.
    pub async fn run(&self, slot: String, project_id: String, mut task: Task) {
        let project = match self.store.get_project(&project_id) {
            Ok(Some(p)) => p,
            Ok(None) => {
                self.fail(&project_id, &task.id, &slot, "project not found".to_string());
                return;
            }
            Err(e) => {
                self.fail(&project_id, &task.id, &slot, format!("failed to load project: {}", e));
                return;
            }
        };

        let branch = task_branch_name(&task.id);
        let paths = self.store.paths().clone();
        let repo_dir = paths.repo_dir(&project.id);
        let worktree_dir = paths.worktree_dir(&project.id, &slot);
        let log_dir = paths.logs_dir(&project.id);

        self.events.push(
            "scheduler",
            format!("claimed task {} in project {} on {}", task.id, project.id, slot),
        );

        let worktree_result = {
            let repo_dir = repo_dir.clone();
            let worktree_dir = worktree_dir.clone();
            let branch = branch.clone();
            let remote = project.remote_name.clone();
            let base = project.base_branch.clone();
            tokio::task::spawn_blocking(move || create_worktree(&repo_dir, &worktree_dir, &branch, &remote, &base))
                .await
        };

        let base_ref = match worktree_result {
            Ok(Ok(info)) => info.base_ref,
            Ok(Err(e)) => {
                self.fail(&project.id, &task.id, &slot, format!("worktree creation failed: {}", e));
                return;
            }
            Err(e) => {
                self.fail(&project.id, &task.id, &slot, format!("worktree creation panicked: {}", e));
                return;
            }
        };

        let experience = fetch_cross_project_experience(
            self.store.clone(),
            Duration::from_secs(self.config.experience_fetch_timeout_secs),
        )
        .await;
        write_experience_note(&worktree_dir, &experience);

        let forwarded_env = forwarded_env_vars(&self.config.forwarded_env_vars);

        let container_id = {
            let pool = self.pool.clone();
            let project = project.clone();
            let task = task.clone();
            let worktree_dir = worktree_dir.clone();
            let repo_dir = repo_dir.clone();
            let log_dir = log_dir.clone();
            let branch = branch.clone();
            let slot = slot.clone();
            let worker_image = self.config.worker_image.clone();
            let manager_url = self.config.manager_url.clone();
            let docker_network = self.config.docker_network.clone();
            tokio::task::spawn_blocking(move || {
                pool.run_task(
                    &slot,
                    &project,
                    &task,
                    &worktree_dir,
                    &repo_dir,
                    &log_dir,
                    &branch,
                    &worker_image,
                    &manager_url,
                    docker_network.as_deref(),
                    &forwarded_env,
                )
            })
            .await
        };

        let container_id = match container_id {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                self.cleanup_and_fail(&project, &task.id, &slot, &branch, &worktree_dir, format!("container start failed: {}", e));
                return;
            }
            Err(e) => {
                self.cleanup_and_fail(&project, &task.id, &slot, &branch, &worktree_dir, format!("container start panicked: {}", e));
                return;
            }
        };

        let exit = {
            let pool = self.pool.clone();
            let container_id = container_id.clone();
            tokio::task::spawn_blocking(move || pool.wait_container(&container_id)).await
        };
        let exit = match exit {
            Ok(exit) => exit,
            Err(e) => {
                self.cleanup_and_fail(&project, &task.id, &slot, &branch, &worktree_dir, format!("container wait panicked: {}", e));
                return;
            }
        };

        task = match self.store.get_task(&project.id, &task.id) {
            Ok(Some(t)) => t,
            Ok(None) => {
                self.pool.mark_idle(&slot);
                return;
            }
            Err(_) => task,
        };

        if task.status == TaskStatus::Failed {
            self.cleanup(&project, &branch, &worktree_dir, true);
            self.pool.mark_idle(&slot);
            return;
        }

        if task.status != TaskStatus::Merging && exit.exit_code != 0 {
            let reason = exit.error.unwrap_or_else(|| format!("container exit {}", exit.exit_code));
            self.cleanup_and_fail(&project, &task.id, &slot, &branch, &worktree_dir, reason);
            return;
        }

        let commit_check = {
            let worktree_dir = worktree_dir.clone();
            let base_ref = base_ref.clone();
            let branch = branch.clone();
            tokio::task::spawn_blocking(move || commits_ahead(&worktree_dir, &base_ref, &branch)).await
        };
        match commit_check {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => {
                self.cleanup_and_fail(
                    &project,
                    &task.id,
                    &slot,
                    &branch,
                    &worktree_dir,
                    "no new commits on task branch beyond base".to_string(),
                );
                return;
            }
            Ok(Ok(_)) => {}
        }

        self.finish_under_git_lock(&project, task, &slot, &branch, &worktree_dir, &repo_dir, &log_dir)
            .await;
    }

    async fn finish_under_git_lock(
        &self,
        project: &Project,
        task: Task,
        slot: &str,
        branch: &str,
        worktree_dir: &std::path::Path,
        repo_dir: &std::path::Path,
        log_dir: &std::path::Path,
    ) {
        let git_lock = self.git_locks.for_project(&project.id).await;
        let _guard = git_lock.lock().await;

        let merge_test_timeout = Duration::from_secs(self.config.merge_test_timeout_secs);
        let test_outcome = {
            let worktree_dir = worktree_dir.to_path_buf();
            let repo_dir = repo_dir.to_path_buf();
            let command = project.merge_test_command.clone();
            let base = project.base_branch.clone();
            let slot = slot.to_string();
            let task_id = task.id.clone();
            tokio::task::spawn_blocking(move || {
                merge_and_test(&worktree_dir, &repo_dir, &command, &base, &slot, &task_id, merge_test_timeout)
            })
            .await
        };

        let outcome = match test_outcome {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.cleanup_and_fail(project, &task.id, slot, branch, worktree_dir, format!("merge_and_test error: {}", e));
                return;
            }
            Err(e) => {
                self.cleanup_and_fail(project, &task.id, slot, branch, worktree_dir, format!("merge_and_test panicked: {}", e));
                return;
            }
        };

        if !outcome.success {
            let reason = outcome.failure_reason.unwrap_or_else(|| "merge_and_test failed".to_string());
            let tail = tail_chars(&outcome.output, EXPERIENCE_TAIL_LINES, EXPERIENCE_TAIL_MAX_CHARS);
            self.events.push(
                "merge_and_test",
                format!("task {} failed: {}\n{}", task.id, reason, tail),
            );
            self.cleanup_and_fail(project, &task.id, slot, branch, worktree_dir, reason);
            return;
        }

        if project.auto_merge {
            let merge_result = {
                let repo_dir = repo_dir.to_path_buf();
                let branch = branch.to_string();
                let base = project.base_branch.clone();
                let auto_push = project.auto_push;
                let slot = slot.to_string();
                tokio::task::spawn_blocking(move || auto_merge(&repo_dir, &branch, &base, auto_push, &slot)).await
            };

            match merge_result {
                Ok(MergeOutcome::Merged(commit)) => {
                    self.complete(project, &task, slot, Some(commit.clone()), log_dir).await;
                    self.cleanup(project, branch, worktree_dir, true);
                    if project.auto_push {
                        delete_remote_branch(repo_dir.to_path_buf(), &project.remote_name, branch);
                    }
                }
                Ok(MergeOutcome::Failed) | Err(_) => {
                    let head = read_worktree_head(worktree_dir);
                    self.merge_pending(project, &task, slot, head, log_dir).await;
                    self.cleanup(project, branch, worktree_dir, false);
                }
            }
        } else {
            let head = read_worktree_head(worktree_dir);
            self.merge_pending(project, &task, slot, head, log_dir).await;
            self.cleanup(project, branch, worktree_dir, false);
        }

        self.pool.mark_idle(slot);
    }

    async fn complete(&self, project: &Project, task: &Task, slot: &str, commit_id: Option<String>, log_dir: &std::path::Path) {
        let update = TaskStatusUpdate::new()
            .status(TaskStatus::Completed)
            .commit_id(commit_id.clone())
            .worker_id(None);
        let _ = self.store.update_task_status(&project.id, &task.id, update);
        self.events.push("scheduler", format!("task {} completed", task.id));
        let log_path = log_dir.join(format!("{}.jsonl", slot));
        invoke_experience_hook(
            &self.config.experience_hook_command,
            Duration::from_secs(self.config.experience_hook_timeout_secs),
            project,
            &task.id,
            slot,
            commit_id.as_deref(),
            &log_path,
        )
        .await;
    }

    async fn merge_pending(&self, project: &Project, task: &Task, slot: &str, commit_id: Option<String>, log_dir: &std::path::Path) {
        let update = TaskStatusUpdate::new().status(TaskStatus::MergePending).commit_id(commit_id.clone());
        let _ = self.store.update_task_status(&project.id, &task.id, update);
        self.events.push("scheduler", format!("task {} awaiting manual merge", task.id));
        let log_path = log_dir.join(format!("{}.jsonl", slot));
        invoke_experience_hook(
            &self.config.experience_hook_command,
            Duration::from_secs(self.config.experience_hook_timeout_secs),
            project,
            &task.id,
            slot,
            commit_id.as_deref(),
            &log_path,
        )
        .await;
    }

    fn cleanup(&self, project: &Project, branch: &str, worktree_dir: &std::path::Path, delete_branch_too: bool) {
        let repo_dir = self.store.paths().repo_dir(&project.id);
        let _ = cleanup_worktree(&repo_dir, branch, worktree_dir, delete_branch_too);
    }

    fn cleanup_and_fail(
        &self,
        project: &Project,
        task_id: &str,
        slot: &str,
        branch: &str,
        worktree_dir: &std::path::Path,
        reason: String,
    ) {
        self.cleanup(project, branch, worktree_dir, true);
        self.fail(&project.id, task_id, slot, reason);
    }

    fn fail(&self, project_id: &str, task_id: &str, slot: &str, reason: String) {
        let update = TaskStatusUpdate::new()
            .status(TaskStatus::Failed)
            .error(Some(reason.clone()))
            .worker_id(None);
        let _ = self.store.update_task_status(project_id, task_id, update);
        self.events.push("scheduler", format!("task {} failed: {}", task_id, reason));
        self.pool.mark_idle(slot);
    }
}

fn forwarded_env_vars(names: &[String]) -> Vec<(String, String)> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok().map(|v| (name.clone(), v)))
        .collect()
}

fn write_experience_note(worktree_dir: &std::path::Path, experience: &str) {
    if experience.trim().is_empty() {
        return;
    }
    let _ = std::fs::write(worktree_dir.join("EXPERIENCE.md"), experience);
    let _ = crate::git_worktree::add_to_exclude(worktree_dir, "EXPERIENCE.md");
}

fn read_worktree_head(worktree_dir: &std::path::Path) -> Option<String> {
    crate::git::run_git(worktree_dir, &["rev-parse", "HEAD"]).ok().map(|o| o.stdout)
}

fn delete_remote_branch(repo_dir: std::path::PathBuf, remote: &str, branch: &str) {
    let remote = remote.to_string();
    let branch = branch.to_string();
    std::thread::spawn(move || {
        let _ = crate::git::run_git(&repo_dir, &["push", &remote, "--delete", &branch]);
    });
}

fn tail_chars(text: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    let tail = lines[start..].join("\n");
    tail.chars().rev().take(max_chars).collect::<Vec<_>>().into_iter().rev().collect()
}
