//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Corral daemon configuration.
///
/// This struct represents the contents of the single YAML config file passed
/// to `corral serve --config`. Unknown top-level fields are captured into
/// `extra` rather than rejected, so older configs keep loading after fields
/// are added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the project registry and all per-project state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Number of concurrent worker slots.
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,

    /// Container image task workers run in.
    #[serde(default = "default_worker_image")]
    pub worker_image: String,

    /// Bind address for the status callback HTTP server.
    #[serde(default = "default_callback_bind_addr")]
    pub callback_bind_addr: String,

    /// Base URL worker containers use to reach the callback server.
    #[serde(default = "default_manager_url")]
    pub manager_url: String,

    /// Optional docker network to attach worker containers to.
    #[serde(default)]
    pub docker_network: Option<String>,

    /// Minutes after which a filesystem lock is considered stale (for `lock list`/`doctor`).
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    /// `merge_and_test` timeout, in seconds.
    #[serde(default = "default_merge_test_timeout_secs")]
    pub merge_test_timeout_secs: u64,

    /// Container wait-for-exit timeout, in seconds.
    #[serde(default = "default_container_wait_timeout_secs")]
    pub container_wait_timeout_secs: u64,

    /// Grace period given to a container after `docker stop`, in seconds.
    #[serde(default = "default_container_stop_grace_secs")]
    pub container_stop_grace_secs: u64,

    /// Timeout for fetching cross-project experience before dispatch, in seconds.
    #[serde(default = "default_experience_fetch_timeout_secs")]
    pub experience_fetch_timeout_secs: u64,

    /// Optional external command invoked after every task finishes (success or failure).
    #[serde(default)]
    pub experience_hook_command: Option<Vec<String>>,

    /// Timeout for the experience hook command, in seconds.
    #[serde(default = "default_experience_hook_timeout_secs")]
    pub experience_hook_timeout_secs: u64,

    /// Capacity of the bounded in-memory event ring.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// Names of environment variables forwarded as-is into every worker container.
    #[serde(default = "default_forwarded_env_vars")]
    pub forwarded_env_vars: Vec<String>,

    /// Scheduler poll interval when no worker slot is idle, in seconds.
    #[serde(default = "default_poll_idle_secs")]
    pub poll_idle_secs: u64,

    /// Scheduler poll interval when no claimable task is found, in seconds.
    #[serde(default = "default_poll_empty_secs")]
    pub poll_empty_secs: u64,

    /// Pacing delay between dispatching successive claimed tasks, in seconds.
    #[serde(default = "default_dispatch_pacing_secs")]
    pub dispatch_pacing_secs: u64,

    /// Defaults applied to newly registered projects.
    #[serde(default)]
    pub project_defaults: ProjectDefaults,

    /// Unrecognized top-level fields, preserved on round-trip.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

pub(crate) fn default_data_dir() -> String {
    ".corral".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            worker_count: default_worker_count(),
            worker_image: default_worker_image(),
            callback_bind_addr: default_callback_bind_addr(),
            manager_url: default_manager_url(),
            docker_network: None,
            lock_stale_minutes: default_lock_stale_minutes(),
            merge_test_timeout_secs: default_merge_test_timeout_secs(),
            container_wait_timeout_secs: default_container_wait_timeout_secs(),
            container_stop_grace_secs: default_container_stop_grace_secs(),
            experience_fetch_timeout_secs: default_experience_fetch_timeout_secs(),
            experience_hook_command: None,
            experience_hook_timeout_secs: default_experience_hook_timeout_secs(),
            event_log_capacity: default_event_log_capacity(),
            forwarded_env_vars: default_forwarded_env_vars(),
            poll_idle_secs: default_poll_idle_secs(),
            poll_empty_secs: default_poll_empty_secs(),
            dispatch_pacing_secs: default_dispatch_pacing_secs(),
            project_defaults: ProjectDefaults::default(),
            extra: ExtraFields::default(),
        }
    }
}
