//! Locking subsystem for corral.
//!
//! Two kinds of lock file exist, both stored as a sibling `<name>.json.lock`
//! next to the state file they guard:
//! - The registry lock, guarding `projects.json`.
//! - Each project's task-queue lock, guarding `projects/<pid>/tasks.json`.
//!
//! # Lock Files
//!
//! Lock files are created using **create_new** semantics (exclusive create) so
//! only one process can hold a given lock at a time. Acquisition retries for
//! up to 10 seconds before giving up.
//!
//! # Lock Metadata
//!
//! Each lock file contains JSON metadata:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID (optional)
//! - `created_at`: RFC3339 timestamp
//! - `action`: The action being performed (claim/update/recover/etc.)
//!
//! # RAII Guards
//!
//! Locks are managed through RAII guard objects that automatically release
//! the lock when dropped. If deletion fails during drop, a warning is printed
//! but the program does not crash.

mod guard;
mod metadata;
mod operations;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub use operations::{
    DEFAULT_LOCK_TIMEOUT, acquire_path_lock, acquire_path_lock_timeout, clear_lock,
    list_locks, lock_path_for,
};
pub use types::{LockInfo, LockType};
