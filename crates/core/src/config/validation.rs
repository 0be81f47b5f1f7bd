//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `memory_limit_mb` is 0
    /// - either timer interval is 0
    /// - `user_agent` is empty
    /// - an allow-list or never-cache entry is not an absolute path
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_limit_mb == 0 {
            return Err(ConfigError::Invalid {
                field: "memory_limit_mb".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.budget_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "budget_interval_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.crucial_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "crucial_interval_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(path) = self.api_allowlist.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "api_allowlist".into(),
                reason: format!("'{path}' must start with '/'"),
            });
        }
        if let Some(path) = self.never_cache_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "never_cache_paths".into(),
                reason: format!("'{path}' must start with '/'"),
            });
        }

        if self.crucial_interval_secs >= self.budget_interval_secs {
            tracing::warn!(
                crucial_interval_secs = self.crucial_interval_secs,
                budget_interval_secs = self.budget_interval_secs,
                "crucial refresh does not run more often than the budget check"
            );
        }

        if self.quota_mb < self.memory_limit_mb {
            tracing::warn!(
                quota_mb = self.quota_mb,
                memory_limit_mb = self.memory_limit_mb,
                "reported quota is below the memory ceiling"
            );
        }

        Ok(())
    }
}
