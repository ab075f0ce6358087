//! Tests for the locks subsystem.

use super::*;
use chrono::{Duration, Utc};
use tempfile::TempDir;

fn registry_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("projects.json")
}

#[test]
fn test_lock_metadata_creation() {
    let meta = LockMetadata::new("claim_next");

    assert!(!meta.owner.is_empty());
    assert!(meta.pid.is_some());
    assert_eq!(meta.action, "claim_next");
    assert!(meta.age().num_minutes() < 1);
}

#[test]
fn test_lock_metadata_serialization() {
    let meta = LockMetadata::new("update_task_status");
    let json = meta.to_json().unwrap();

    assert!(json.contains("owner"));
    assert!(json.contains("created_at"));
    assert!(json.contains("update_task_status"));

    let parsed: LockMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.action, "update_task_status");
}

#[test]
fn test_lock_metadata_age_string() {
    let mut meta = LockMetadata::new("test");

    let age_str = meta.age_string();
    assert!(age_str.contains('m'));

    meta.created_at = Utc::now() - Duration::hours(2);
    let age_str = meta.age_string();
    assert!(age_str.contains('h'));

    meta.created_at = Utc::now() - Duration::days(3);
    let age_str = meta.age_string();
    assert!(age_str.contains('d'));
}

#[test]
fn test_lock_metadata_is_stale() {
    let mut meta = LockMetadata::new("test");

    assert!(!meta.is_stale(120));

    meta.created_at = Utc::now() - Duration::minutes(150);
    assert!(meta.is_stale(120));
}

#[test]
fn test_acquire_registry_lock_success() {
    let dir = TempDir::new().unwrap();
    let lock_path = lock_path_for(&registry_path(&dir));

    let guard = acquire_path_lock(&lock_path, "claim_next").unwrap();
    assert!(lock_path.exists());

    let meta = LockMetadata::from_file(&lock_path).unwrap();
    assert_eq!(meta.action, "claim_next");

    drop(guard);
    assert!(!lock_path.exists());
}

#[test]
fn test_acquire_task_queue_lock_success() {
    let dir = TempDir::new().unwrap();
    let tasks_path = dir.path().join("projects").join("abcd1234").join("tasks.json");
    let lock_path = lock_path_for(&tasks_path);

    let guard = acquire_path_lock(&lock_path, "update_task_status").unwrap();
    assert!(lock_path.exists());
    drop(guard);
    assert!(!lock_path.exists());
}

#[test]
fn test_acquire_same_lock_twice_fails() {
    let dir = TempDir::new().unwrap();
    let lock_path = lock_path_for(&registry_path(&dir));

    let guard1 = acquire_path_lock(&lock_path, "first").unwrap();

    let result = acquire_path_lock_timeout(&lock_path, "second", std::time::Duration::from_millis(50));
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(matches!(err, crate::error::CorralError::LockError(_)));
    assert!(err.to_string().contains("held by another process"));

    drop(guard1);

    let guard2 = acquire_path_lock(&lock_path, "third").unwrap();
    drop(guard2);
}

#[test]
fn test_lock_guard_manual_release() {
    let dir = TempDir::new().unwrap();
    let lock_path = lock_path_for(&registry_path(&dir));

    let guard = acquire_path_lock(&lock_path, "test").unwrap();
    guard.release().unwrap();

    assert!(!lock_path.exists());
}

#[test]
fn test_list_locks_empty() {
    let dir = TempDir::new().unwrap();
    let locks = list_locks(dir.path(), 120).unwrap();
    assert!(locks.is_empty());
}

#[test]
fn test_list_locks_with_locks() {
    let dir = TempDir::new().unwrap();
    let registry_lock = lock_path_for(&registry_path(&dir));
    let tasks_lock = lock_path_for(&dir.path().join("tasks.json"));

    let _registry_guard = acquire_path_lock(&registry_lock, "claim_next").unwrap();
    let _tasks_guard = acquire_path_lock(&tasks_lock, "update_task_status").unwrap();

    let locks = list_locks(dir.path(), 120).unwrap();
    assert_eq!(locks.len(), 2);

    let names: Vec<&str> = locks.iter().map(|l| l.name.as_str()).collect();
    assert!(names.contains(&"projects"));
    assert!(names.contains(&"tasks"));
}

#[test]
fn test_list_locks_detects_stale() {
    let dir = TempDir::new().unwrap();

    let stale_meta = LockMetadata {
        owner: "test@host".to_string(),
        pid: Some(12345),
        created_at: Utc::now() - Duration::minutes(200),
        action: "old_action".to_string(),
    };

    let lock_path = lock_path_for(&dir.path().join("tasks.json"));
    std::fs::write(&lock_path, stale_meta.to_json().unwrap()).unwrap();

    let locks = list_locks(dir.path(), 120).unwrap();
    assert_eq!(locks.len(), 1);
    assert!(locks[0].is_stale);
}

#[test]
fn test_clear_lock_success() {
    let dir = TempDir::new().unwrap();
    let lock_path = lock_path_for(&registry_path(&dir));

    let meta = LockMetadata::new("test");
    std::fs::write(&lock_path, meta.to_json().unwrap()).unwrap();
    assert!(lock_path.exists());

    let cleared = clear_lock(&lock_path, 120).unwrap();
    assert!(!lock_path.exists());
    assert_eq!(cleared.name, "projects");
    assert_eq!(cleared.lock_type, LockType::Registry);
}

#[test]
fn test_clear_lock_nonexistent_fails() {
    let dir = TempDir::new().unwrap();
    let lock_path = lock_path_for(&dir.path().join("nope.json"));

    let result = clear_lock(&lock_path, 120);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("does not exist"));
}

#[test]
fn test_lock_info_display() {
    let dir = TempDir::new().unwrap();
    let meta = LockMetadata::new("test_action");
    let lock_info = LockInfo {
        path: lock_path_for(&registry_path(&dir)),
        name: "projects".to_string(),
        lock_type: LockType::Registry,
        metadata: meta,
        is_stale: false,
    };

    let display = format!("{}", lock_info);
    assert!(display.contains("projects"));
    assert!(display.contains("test_action"));
    assert!(!display.contains("STALE"));

    let stale_info = LockInfo {
        is_stale: true,
        ..lock_info
    };
    let stale_display = format!("{}", stale_info);
    assert!(stale_display.contains("STALE"));
}

#[test]
fn test_get_owner_string() {
    let owner = metadata::get_owner_string();
    assert!(owner.contains('@'));
    assert!(!owner.is_empty());
}
