//! Cross-project experience: a best-effort read of other projects' running
//! notes before dispatch, and the post-task hook that appends to them.
//!
//! The experience log itself (`PROGRESS.md` in each project's repo) is
//! maintained by an external hook the core merely invokes; the core's own
//! obligation is to gather what already exists and hand it to the worker,
//! then shell out to the hook afterwards without letting its failure affect
//! the task outcome.

use crate::registry::{Project, RegistryStore};
use std::time::Duration;

const EXPERIENCE_FILE: &str = "PROGRESS.md";
const MAX_EXPERIENCE_CHARS: usize = 4000;

/// Read `PROGRESS.md` from every ready project's repo and concatenate a
/// bounded excerpt of each, labeled by project name. Best-effort: missing
/// files are skipped, and the whole gather is capped by `timeout`.
pub async fn fetch_cross_project_experience(store: RegistryStore, timeout: Duration) -> String {
    let result = tokio::time::timeout(
        timeout,
        tokio::task::spawn_blocking(move || gather_experience_sync(&store)),
    )
    .await;

    match result {
        Ok(Ok(text)) => text,
        Ok(Err(_)) | Err(_) => String::new(),
    }
}

fn gather_experience_sync(store: &RegistryStore) -> String {
    let Ok(projects) = store.list_ready_projects() else {
        return String::new();
    };

    let mut sections = Vec::new();
    for project in &projects {
        let path = store.paths().repo_dir(&project.id).join(EXPERIENCE_FILE);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        let excerpt: String = content.chars().take(MAX_EXPERIENCE_CHARS).collect();
        if excerpt.trim().is_empty() {
            continue;
        }
        sections.push(format!("## {}\n\n{}", project.name, excerpt.trim()));
    }

    sections.join("\n\n")
}

/// Invoke the configured experience hook after a task reaches `completed`
/// or `merge_pending`. Best-effort: a missing command is a no-op, and any
/// failure (spawn error, non-zero exit, timeout) is only logged.
pub async fn invoke_experience_hook(
    command: &Option<Vec<String>>,
    timeout: Duration,
    project: &Project,
    task_id: &str,
    worker_id: &str,
    commit_id: Option<&str>,
    log_path: &std::path::Path,
) {
    let Some(command) = command else { return };
    if command.is_empty() {
        return;
    }

    let mut cmd = tokio::process::Command::new(&command[0]);
    cmd.args(&command[1..])
        .env("PROJECT_ID", &project.id)
        .env("PROJECT_NAME", &project.name)
        .env("TASK_ID", task_id)
        .env("WORKER_ID", worker_id)
        .env("COMMIT_ID", commit_id.unwrap_or(""))
        .env("AGENT_LOG_PATH", log_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped());

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(project_id = %project.id, task_id, error = %e, "failed to spawn experience hook");
            return;
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(project_id = %project.id, task_id, stderr = %stderr.trim(), "experience hook exited non-zero");
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            tracing::warn!(project_id = %project.id, task_id, error = %e, "experience hook execution error");
        }
        Err(_) => {
            tracing::warn!(project_id = %project.id, task_id, "experience hook timed out");
        }
    }
}
