//! Config loading, validation, and environment-variable overrides.

use super::model::Config;
use crate::error::{CorralError, Result};
use std::path::Path;

impl Config {
    /// Load config from a YAML file, applying environment-variable overrides
    /// and validating the result.
    ///
    /// Unknown top-level fields in the YAML are preserved (not rejected) for
    /// forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CorralError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string, applying environment-variable
    /// overrides and validating the result.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| CorralError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            CorralError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Apply `CORRAL_*` environment variable overrides on top of the YAML-loaded values.
    ///
    /// Env vars take precedence over the config file so a deployment can
    /// override a single setting (e.g. `CORRAL_DATA_DIR`) without editing YAML.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CORRAL_DATA_DIR") {
            self.data_dir = v;
        }
        if let Ok(v) = std::env::var("CORRAL_WORKER_COUNT")
            && let Ok(n) = v.parse()
        {
            self.worker_count = n;
        }
        if let Ok(v) = std::env::var("CORRAL_WORKER_IMAGE") {
            self.worker_image = v;
        }
        if let Ok(v) = std::env::var("CORRAL_CALLBACK_BIND_ADDR") {
            self.callback_bind_addr = v;
        }
        if let Ok(v) = std::env::var("CORRAL_MANAGER_URL") {
            self.manager_url = v;
        }
    }

    /// Validate config values and return an error on invalid ones.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(CorralError::ConfigError(
                "config validation failed: worker_count must be greater than 0".to_string(),
            ));
        }

        if self.data_dir.trim().is_empty() {
            return Err(CorralError::ConfigError(
                "config validation failed: data_dir must not be empty".to_string(),
            ));
        }

        if self.worker_image.trim().is_empty() {
            return Err(CorralError::ConfigError(
                "config validation failed: worker_image must not be empty".to_string(),
            ));
        }

        if self.callback_bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(CorralError::ConfigError(format!(
                "config validation failed: callback_bind_addr '{}' is not a valid socket address",
                self.callback_bind_addr
            )));
        }

        if self.lock_stale_minutes == 0 {
            return Err(CorralError::ConfigError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        if self.merge_test_timeout_secs == 0 {
            return Err(CorralError::ConfigError(
                "config validation failed: merge_test_timeout_secs must be greater than 0"
                    .to_string(),
            ));
        }

        if self.container_wait_timeout_secs == 0 {
            return Err(CorralError::ConfigError(
                "config validation failed: container_wait_timeout_secs must be greater than 0"
                    .to_string(),
            ));
        }

        if let Some(ref cmd) = self.experience_hook_command
            && cmd.is_empty()
        {
            return Err(CorralError::ConfigError(
                "config validation failed: experience_hook_command, if set, must not be empty"
                    .to_string(),
            ));
        }

        if self.project_defaults.base_branch.trim().is_empty() {
            return Err(CorralError::ConfigError(
                "config validation failed: project_defaults.base_branch must not be empty"
                    .to_string(),
            ));
        }

        if self.project_defaults.remote.trim().is_empty() {
            return Err(CorralError::ConfigError(
                "config validation failed: project_defaults.remote must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
