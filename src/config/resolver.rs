//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`TODOKV_DB`, `TODOKV_LOG`)
//! 3. config.kdl (`$TODOKV_CONFIG` or `~/.config/todokv/config.kdl`)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::{TodoConfig, validate_log_level};
use crate::storage::{BackendType, StoreConfig};
use crate::{Error, Result};

/// Environment variable naming the database file.
pub const DB_ENV: &str = "TODOKV_DB";
/// Environment variable holding the log level (or a full tracing filter).
pub const LOG_ENV: &str = "TODOKV_LOG";
/// Environment variable pointing at an alternative config.kdl.
pub const CONFIG_ENV: &str = "TODOKV_CONFIG";

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub backend: Option<BackendType>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The config file consulted, whether or not it exists
    pub config_file: Option<PathBuf>,
    pub database_path: Resolved<PathBuf>,
    pub backend: Resolved<BackendType>,
    pub busy_timeout: Resolved<Duration>,
    pub log_level: Resolved<String>,
}

impl ResolvedConfig {
    pub fn database_path(&self) -> &PathBuf {
        &self.database_path.value
    }

    pub fn backend(&self) -> BackendType {
        self.backend.value
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout.value
    }

    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }

    /// Store settings for [`crate::storage::with_store`].
    pub fn to_store_config(&self) -> StoreConfig {
        match self.backend() {
            BackendType::Sqlite => {
                StoreConfig::sqlite(self.database_path.value.clone(), self.busy_timeout())
            }
            BackendType::Memory => StoreConfig::memory(),
        }
    }
}

/// Location of config.kdl: `$TODOKV_CONFIG`, else the platform config dir.
pub fn config_file_path(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    match env(CONFIG_ENV).filter(|v| !v.is_empty()) {
        Some(path) => Some(PathBuf::from(path)),
        None => dirs::config_dir().map(|dir| dir.join("todokv").join("config.kdl")),
    }
}

/// Default database location under the platform data dir.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("todokv").join("todos.db"))
}

/// Resolve configuration from the process environment.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    resolve_config_with_env(overrides, |name| std::env::var(name).ok())
}

/// Resolve configuration with an explicit environment lookup.
pub fn resolve_config_with_env(
    overrides: &ConfigOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let config_file = config_file_path(&env);
    let file = match config_file {
        Some(ref path) => TodoConfig::load(path)?,
        None => TodoConfig::new(),
    };
    let from_env = |name: &str| env(name).filter(|v| !v.is_empty());

    // Resolve database path
    let database_path = if let Some(ref path) = overrides.database_path {
        Resolved::new(path.clone(), ValueSource::CliFlag)
    } else if let Some(path) = from_env(DB_ENV) {
        Resolved::new(PathBuf::from(path), ValueSource::EnvVar(DB_ENV.to_string()))
    } else if let Some(ref path) = file.database_path {
        Resolved::new(path.clone(), ValueSource::ConfigFile)
    } else {
        let path = default_database_path().ok_or_else(|| {
            Error::Config(format!(
                "could not determine a data directory; pass --db or set {}",
                DB_ENV
            ))
        })?;
        Resolved::new(path, ValueSource::Default)
    };

    // Resolve backend
    let backend = if let Some(backend) = overrides.backend {
        Resolved::new(backend, ValueSource::CliFlag)
    } else if let Some(backend) = file.backend.as_deref().and_then(BackendType::parse) {
        Resolved::new(backend, ValueSource::ConfigFile)
    } else {
        Resolved::new(BackendType::default(), ValueSource::Default)
    };

    // Resolve busy timeout
    let busy_timeout = match file.busy_timeout_ms.and_then(|ms| u64::try_from(ms).ok()) {
        Some(ms) => Resolved::new(Duration::from_millis(ms), ValueSource::ConfigFile),
        None => Resolved::new(
            Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            ValueSource::Default,
        ),
    };

    // Resolve log level
    let log_level = if let Some(ref level) = overrides.log_level {
        validate_log_level(level)?;
        Resolved::new(level.to_lowercase(), ValueSource::CliFlag)
    } else if let Some(level) = from_env(LOG_ENV) {
        // TODOKV_LOG may also be a full filter directive; main hands it to EnvFilter as is
        Resolved::new(level, ValueSource::EnvVar(LOG_ENV.to_string()))
    } else if let Some(ref level) = file.log_level {
        Resolved::new(level.to_lowercase(), ValueSource::ConfigFile)
    } else {
        Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default)
    };

    Ok(ResolvedConfig {
        config_file,
        database_path,
        backend,
        busy_timeout,
        log_level,
    })
}
