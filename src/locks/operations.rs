//! Lock acquisition, listing, and clearing operations.
//!
//! Locks are plain paths: the registry lock guards `projects.json`, and each
//! project's task-queue lock guards that project's `tasks.json`. Both kinds
//! share the same create_new-exclusive-file mechanism and JSON metadata shape.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use super::types::{LockInfo, LockType};
use crate::error::{CorralError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long to retry before giving up on a contended lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Acquire a lock file using create_new semantics, retrying until `timeout` elapses.
///
/// # Arguments
///
/// * `lock_path` - Path to the lock file
/// * `metadata` - Metadata to write to the lock file
/// * `timeout` - How long to retry before failing
fn acquire_lock(lock_path: &Path, metadata: &LockMetadata, timeout: Duration) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            CorralError::UserError(format!(
                "failed to create locks directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let start = std::time::Instant::now();
    loop {
        match try_acquire_once(lock_path, metadata) {
            Ok(guard) => return Ok(guard),
            Err(err) if start.elapsed() < timeout => {
                let _ = err;
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(err) => return Err(err),
        }
    }
}

fn try_acquire_once(lock_path: &Path, metadata: &LockMetadata) -> Result<LockGuard> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                let existing_info = match LockMetadata::from_file(lock_path) {
                    Ok(meta) => format!(
                        "\nLock: {} (created {} ago by {})\nAction: {}",
                        lock_path.display(),
                        meta.age_string(),
                        meta.owner,
                        meta.action
                    ),
                    Err(_) => format!("\nLock: {}", lock_path.display()),
                };
                CorralError::LockError(format!("lock is held by another process{}", existing_info))
            } else {
                CorralError::LockError(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(lock_path);
        CorralError::LockError(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(lock_path);
        CorralError::LockError(format!("failed to sync lock file: {}", e))
    })?;

    Ok(LockGuard::new(lock_path.to_path_buf()))
}

/// Acquire an exclusive lock on an arbitrary path, retrying for `DEFAULT_LOCK_TIMEOUT`.
///
/// This is the primitive the registry store uses for both the registry lock
/// (`projects.json.lock`) and each project's task-queue lock (`tasks.json.lock`).
pub fn acquire_path_lock(lock_path: &Path, action: &str) -> Result<LockGuard> {
    let metadata = LockMetadata::new(action);
    acquire_lock(lock_path, &metadata, DEFAULT_LOCK_TIMEOUT)
}

/// Acquire an exclusive lock on an arbitrary path with an explicit timeout.
pub fn acquire_path_lock_timeout(
    lock_path: &Path,
    action: &str,
    timeout: Duration,
) -> Result<LockGuard> {
    let metadata = LockMetadata::new(action);
    acquire_lock(lock_path, &metadata, timeout)
}

/// List all active locks under a directory (non-recursive), matching `*.lock`.
///
/// # Arguments
///
/// * `dir` - Directory to scan for lock files
/// * `stale_minutes` - Age threshold beyond which a lock is flagged stale
pub fn list_locks(dir: &Path, stale_minutes: u32) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !dir.exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        CorralError::UserError(format!("failed to read locks directory '{}': {}", dir.display(), e))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            CorralError::UserError(format!("failed to read locks directory entry: {}", e))
        })?;

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        let metadata = match LockMetadata::from_file(&path) {
            Ok(meta) => meta,
            Err(_) => continue,
        };

        let filename = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let (lock_type, name) = classify_lock(filename);
        let is_stale = metadata.is_stale(stale_minutes);

        locks.push(LockInfo {
            path,
            name,
            lock_type,
            metadata,
            is_stale,
        });
    }

    locks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(locks)
}

fn classify_lock(filename: &str) -> (LockType, String) {
    if filename == "projects.json" {
        (LockType::Registry, "projects".to_string())
    } else if filename == "tasks.json" {
        (LockType::TaskQueue, "tasks".to_string())
    } else {
        (LockType::TaskQueue, filename.to_string())
    }
}

/// Clear a lock file at the given path.
///
/// The caller is responsible for verifying that clearing the lock is
/// appropriate (e.g., checking `--force`).
pub fn clear_lock(lock_path: &Path, stale_minutes: u32) -> Result<LockInfo> {
    if !lock_path.exists() {
        return Err(CorralError::UserError(format!(
            "lock does not exist at: {}",
            lock_path.display()
        )));
    }

    let metadata = LockMetadata::from_file(lock_path)?;
    let filename = lock_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let (lock_type, name) = classify_lock(filename);
    let is_stale = metadata.is_stale(stale_minutes);

    let lock_info = LockInfo {
        path: lock_path.to_path_buf(),
        name,
        lock_type,
        metadata,
        is_stale,
    };

    fs::remove_file(lock_path).map_err(|e| {
        CorralError::UserError(format!("failed to clear lock '{}': {}", lock_path.display(), e))
    })?;

    Ok(lock_info)
}

/// Conventional lock path for a JSON state file: `foo.json` -> `foo.json.lock`.
pub fn lock_path_for(state_file: &Path) -> PathBuf {
    let mut name = state_file.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    state_file.with_file_name(name)
}
