//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (RESPCACHE_*)
//! 2. TOML config file (if RESPCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Bytes per megabyte as reported by storage estimates.
pub const MB: u64 = 1_000_000;

/// Which partition store backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// What usage figure the budget check compares against the memory ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetScope {
    /// Each partition is measured on its own and deleted when it alone
    /// exceeds the ceiling.
    #[default]
    Partition,
    /// Total storage usage is re-read before each partition, so partitions
    /// are deleted in list order until the total drops under the ceiling.
    Total,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (RESPCACHE_*)
/// 2. TOML config file (if RESPCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via RESPCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Partition store backend: "sqlite" or "memory".
    #[serde(default)]
    pub store: StoreBackend,

    /// Storage ceiling in MB above which the budget check deletes partitions.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,

    /// Quota in MB reported alongside usage by the storage estimator.
    #[serde(default = "default_quota_mb")]
    pub quota_mb: u64,

    /// Seconds between budget checks.
    #[serde(default = "default_budget_interval_secs")]
    pub budget_interval_secs: u64,

    /// Seconds between forced refreshes of the markup and data partitions.
    #[serde(default = "default_crucial_interval_secs")]
    pub crucial_interval_secs: u64,

    #[serde(default)]
    pub budget_scope: BudgetScope,

    /// Whether allow-listed API paths are cached.
    ///
    /// Set via RESPCACHE_API_CACHE_ENABLED environment variable.
    #[serde(default)]
    pub api_cache_enabled: bool,

    /// API paths cached when `api_cache_enabled` is set.
    #[serde(default = "default_api_allowlist")]
    pub api_allowlist: Vec<String>,

    /// Store only 2xx responses. Off by default: every response the network
    /// returns on a miss is stored, error statuses included.
    #[serde(default)]
    pub cache_success_only: bool,

    /// Paths that are always fetched from the network and never stored.
    #[serde(default = "default_never_cache_paths")]
    pub never_cache_paths: Vec<String>,

    /// Also intercept plain `http` requests.
    #[serde(default)]
    pub intercept_insecure: bool,

    /// User-Agent string for network fetches.
    ///
    /// Set via RESPCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional network timeout in milliseconds. Unset means fetches may hang.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./respcache.sqlite")
}

fn default_memory_limit_mb() -> u64 {
    200
}

fn default_quota_mb() -> u64 {
    1024
}

fn default_budget_interval_secs() -> u64 {
    30 * 60
}

fn default_crucial_interval_secs() -> u64 {
    10 * 60
}

fn default_api_allowlist() -> Vec<String> {
    vec!["/rest/getExamPlan".into(), "/pv5/v8/1/api/GetUserByGUID".into()]
}

fn default_never_cache_paths() -> Vec<String> {
    vec!["/env_configs/configs.js".into()]
}

fn default_user_agent() -> String {
    "respcache/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            store: StoreBackend::default(),
            memory_limit_mb: default_memory_limit_mb(),
            quota_mb: default_quota_mb(),
            budget_interval_secs: default_budget_interval_secs(),
            crucial_interval_secs: default_crucial_interval_secs(),
            budget_scope: BudgetScope::default(),
            api_cache_enabled: false,
            api_allowlist: default_api_allowlist(),
            cache_success_only: false,
            never_cache_paths: default_never_cache_paths(),
            intercept_insecure: false,
            user_agent: default_user_agent(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Storage ceiling in bytes.
    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb * MB
    }

    /// Reported quota in bytes.
    pub fn quota_bytes(&self) -> u64 {
        self.quota_mb * MB
    }

    pub fn budget_interval(&self) -> Duration {
        Duration::from_secs(self.budget_interval_secs)
    }

    pub fn crucial_interval(&self) -> Duration {
        Duration::from_secs(self.crucial_interval_secs)
    }

    /// Network timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `RESPCACHE_`
    /// 2. TOML file from `RESPCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("RESPCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("RESPCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
