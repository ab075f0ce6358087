//! Configuration value types and default-value functions for corral.

use std::collections::HashMap;

/// Default number of worker slots.
pub(crate) fn default_worker_count() -> u32 {
    3
}

/// Default container image task workers run in.
pub(crate) fn default_worker_image() -> String {
    "claude-worker:latest".to_string()
}

/// Default bind address for the status callback HTTP server.
pub(crate) fn default_callback_bind_addr() -> String {
    "127.0.0.1:8420".to_string()
}

/// Default base URL the worker containers use to reach the callback server.
pub(crate) fn default_manager_url() -> String {
    "http://host.docker.internal:8420".to_string()
}

/// Default minutes after which a filesystem lock is considered stale.
pub(crate) fn default_lock_stale_minutes() -> u32 {
    15
}

/// Default merge_and_test timeout, in seconds.
pub(crate) fn default_merge_test_timeout_secs() -> u64 {
    600
}

/// Default container wait timeout, in seconds.
pub(crate) fn default_container_wait_timeout_secs() -> u64 {
    1800
}

/// Default container stop grace period, in seconds.
pub(crate) fn default_container_stop_grace_secs() -> u64 {
    10
}

/// Default experience hook timeout, in seconds.
pub(crate) fn default_experience_hook_timeout_secs() -> u64 {
    120
}

/// Default bounded in-memory event ring capacity.
pub(crate) fn default_event_log_capacity() -> usize {
    200
}

/// Default environment variable names forwarded (as-is) into every worker container.
pub(crate) fn default_forwarded_env_vars() -> Vec<String> {
    Vec::new()
}

/// Default base branch for newly added projects.
pub(crate) fn default_base_branch() -> String {
    "main".to_string()
}

/// Default remote name for newly added projects.
pub(crate) fn default_remote() -> String {
    "origin".to_string()
}

/// Default fetch-cross-project-experience timeout, in seconds.
pub(crate) fn default_experience_fetch_timeout_secs() -> u64 {
    10
}

/// Default scheduler poll interval when no idle worker slot is free, in seconds.
pub(crate) fn default_poll_idle_secs() -> u64 {
    10
}

/// Default scheduler poll interval when no claimable task is found, in seconds.
pub(crate) fn default_poll_empty_secs() -> u64 {
    15
}

/// Default pacing delay between dispatching successive tasks, in seconds.
pub(crate) fn default_dispatch_pacing_secs() -> u64 {
    2
}

/// Per-project defaults used when `corral project add` does not override them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProjectDefaults {
    /// Default base branch for newly added projects (e.g. "main").
    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Default remote name (e.g. "origin").
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Whether newly added projects auto-merge by default.
    #[serde(default)]
    pub auto_merge: bool,

    /// Whether newly added projects auto-push by default (only meaningful
    /// when `auto_merge` is true).
    #[serde(default)]
    pub auto_push: bool,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            base_branch: default_base_branch(),
            remote: default_remote(),
            auto_merge: false,
            auto_push: false,
        }
    }
}

/// Arbitrary extra top-level fields preserved for forward compatibility.
pub type ExtraFields = HashMap<String, serde_yaml::Value>;
