//! Project repo setup: turns a freshly registered project's `source` into
//! a main working directory at `<data>/projects/<pid>/repo`.
//!
//! Runs synchronously from the `corral project add` command rather than as
//! a detached background job — the CLI is already a separate short-lived
//! process from the daemon, so there is no long-running loop to avoid
//! blocking. The project sits in `Cloning` status for the duration of the
//! call and flips to `Ready` or `Error` before the command returns, exactly
//! as the data model describes.

use crate::error::{CorralError, Result};
use crate::registry::{Project, ProjectSource, ProjectStatus, RegistryStore};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Clone timeout, per the system's fixed subprocess deadlines.
const CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// First 300 chars of stderr are kept as the project's recorded error.
const ERROR_TRUNCATE_CHARS: usize = 300;

/// Materialize `project.source` at `repo_dir`, then persist the resulting
/// `Ready`/`Error` status back to the registry.
pub fn run(store: &RegistryStore, project: &Project) -> Result<()> {
    let repo_dir = store.paths().repo_dir(&project.id);

    let outcome = match &project.source {
        ProjectSource::Remote { url } => clone_remote(url, &repo_dir),
        ProjectSource::Local { path } => symlink_local(Path::new(path), &repo_dir),
        ProjectSource::New => init_empty(&repo_dir, &project.base_branch),
    };

    match outcome {
        Ok(()) => {
            store.update_project(&project.id, |p| {
                p.status = ProjectStatus::Ready;
                p.error = None;
            })?;
        }
        Err(e) => {
            let message = truncate(&e.to_string(), ERROR_TRUNCATE_CHARS);
            store.update_project(&project.id, |p| {
                p.status = ProjectStatus::Error;
                p.error = Some(message.clone());
            })?;
        }
    }
    Ok(())
}

fn clone_remote(url: &str, repo_dir: &Path) -> Result<()> {
    if let Some(parent) = repo_dir.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CorralError::GitError(format!("failed to create project directory: {}", e)))?;
    }

    let url = url.to_string();
    let dest = repo_dir.to_path_buf();
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let result = Command::new("git")
            .args(["clone", &url, &dest.to_string_lossy()])
            .stdout(Stdio::null())
            .output();
        let _ = tx.send(result);
    });

    match rx.recv_timeout(CLONE_TIMEOUT) {
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => Err(CorralError::GitError(format!(
            "git clone failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
        Ok(Err(e)) => Err(CorralError::GitError(format!("failed to execute git clone: {}", e))),
        Err(_) => Err(CorralError::GitError(format!(
            "git clone timed out after {}s",
            CLONE_TIMEOUT.as_secs()
        ))),
    }
}

fn symlink_local(source: &Path, repo_dir: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(CorralError::GitError(format!(
            "local path '{}' does not exist or is not a directory",
            source.display()
        )));
    }
    if !source.join(".git").exists() {
        return Err(CorralError::GitError(format!(
            "local path '{}' is not a git repository",
            source.display()
        )));
    }

    if let Some(parent) = repo_dir.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CorralError::GitError(format!("failed to create project directory: {}", e)))?;
    }

    let canonical = source
        .canonicalize()
        .map_err(|e| CorralError::GitError(format!("failed to resolve local path '{}': {}", source.display(), e)))?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&canonical, repo_dir)
            .map_err(|e| CorralError::GitError(format!("failed to symlink '{}': {}", canonical.display(), e)))?;
    }
    #[cfg(not(unix))]
    {
        return Err(CorralError::GitError(
            "local-path projects require a Unix host for symlink support".to_string(),
        ));
    }

    Ok(())
}

fn init_empty(repo_dir: &Path, base_branch: &str) -> Result<()> {
    std::fs::create_dir_all(repo_dir)
        .map_err(|e| CorralError::GitError(format!("failed to create project directory: {}", e)))?;

    crate::git::run_git(repo_dir, &["init"])?;
    crate::git::run_git(repo_dir, &["symbolic-ref", "HEAD", &format!("refs/heads/{}", base_branch)])?;
    crate::git::run_git(repo_dir, &["config", "user.email", "corral@localhost"])?;
    crate::git::run_git(repo_dir, &["config", "user.name", "corral"])?;

    std::fs::write(repo_dir.join("README.md"), "# New project\n")
        .map_err(|e| CorralError::GitError(format!("failed to write initial README.md: {}", e)))?;
    crate::git::run_git(repo_dir, &["add", "."])?;
    crate::git::run_git(repo_dir, &["commit", "-m", "Initial commit"])?;

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProjectSource;
    use chrono::Utc;
    use tempfile::TempDir;

    fn project(id: &str, source: ProjectSource) -> Project {
        Project {
            id: id.to_string(),
            name: "demo".to_string(),
            source,
            remote_url: None,
            base_branch: "main".to_string(),
            remote_name: "origin".to_string(),
            auto_merge: false,
            auto_push: false,
            merge_test_command: vec!["./merge_and_test.sh".to_string()],
            status: ProjectStatus::Cloning,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn new_source_initializes_empty_repo_and_marks_ready() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path());
        let p = project("proj0001", ProjectSource::New);
        store.create_project(p.clone()).unwrap();

        run(&store, &p).unwrap();

        let updated = store.get_project("proj0001").unwrap().unwrap();
        assert_eq!(updated.status, ProjectStatus::Ready);
        assert!(store.paths().repo_dir("proj0001").join(".git").exists());
    }

    #[test]
    fn local_source_requires_existing_git_repo() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path());
        let not_a_repo = TempDir::new().unwrap();
        let p = project("proj0001", ProjectSource::Local { path: not_a_repo.path().to_string_lossy().to_string() });
        store.create_project(p.clone()).unwrap();

        run(&store, &p).unwrap();

        let updated = store.get_project("proj0001").unwrap().unwrap();
        assert_eq!(updated.status, ProjectStatus::Error);
        assert!(updated.error.unwrap().contains("not a git repository"));
    }

    #[test]
    fn local_source_symlinks_existing_repo() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path());
        let source_repo = crate::test_support::create_test_repo();
        let p = project("proj0001", ProjectSource::Local { path: source_repo.path().to_string_lossy().to_string() });
        store.create_project(p.clone()).unwrap();

        run(&store, &p).unwrap();

        let updated = store.get_project("proj0001").unwrap().unwrap();
        assert_eq!(updated.status, ProjectStatus::Ready);
        assert!(store.paths().repo_dir("proj0001").join("README.md").exists());
    }
}
