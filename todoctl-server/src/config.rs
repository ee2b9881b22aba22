//! Server configuration
//!
//! Precedence, lowest to highest: built-in defaults, TOML file
//! (`~/.todoctl/config.toml` or an explicit path), environment
//! (`DATABASE_URL`, `TODOCTL_BIND`), then whatever the caller overrides.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! cors_permissive = false
//!
//! [database]
//! url = "postgres://localhost/todoctl"
//! max_connections = 10
//!
//! [executor]
//! core_workers = 2
//! max_workers = 4
//! queue_capacity = 500
//!
//! [retry]
//! max_attempts = 3
//! delay_ms = 50
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::db::pool::DEFAULT_MAX_CONNECTIONS;
use crate::executor::{ExecutorConfig, ExecutorConfigError};
use crate::http::ServerConfig;
use crate::service::RetryPolicy;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("invalid executor settings: {0}")]
    Executor(#[from] ExecutorConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind: defaults.bind_addr,
            cors_permissive: defaults.cors_permissive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub core_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub keep_alive_secs: u64,
    pub await_termination_secs: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        let defaults = ExecutorConfig::default();
        Self {
            core_workers: defaults.core_workers,
            max_workers: defaults.max_workers,
            queue_capacity: defaults.queue_capacity,
            keep_alive_secs: defaults.keep_alive.as_secs(),
            await_termination_secs: defaults.await_termination.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_attempts: defaults.max_attempts,
            delay_ms: defaults.initial_delay.as_millis() as u64,
        }
    }
}

/// Full todoctl configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TodoConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub executor: ExecutorSection,
    pub retry: RetrySection,
}

impl TodoConfig {
    /// Default config file path: ~/.todoctl/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".todoctl").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist; the default path is optional.
    /// Environment overrides are applied after the file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|var| std::env::var(var).ok())?;
        config.executor_config()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply `DATABASE_URL` and `TODOCTL_BIND` from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            self.database.url = Some(url);
        }

        if let Some(bind) = lookup("TODOCTL_BIND") {
            self.server.bind = bind.parse().map_err(|_| ConfigError::Env {
                var: "TODOCTL_BIND",
                value: bind.clone(),
            })?;
        }

        Ok(())
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.server.bind,
            cors_permissive: self.server.cors_permissive,
        }
    }

    /// Executor sizing, validated.
    pub fn executor_config(&self) -> Result<ExecutorConfig, ConfigError> {
        let config = ExecutorConfig {
            core_workers: self.executor.core_workers,
            max_workers: self.executor.max_workers,
            queue_capacity: self.executor.queue_capacity,
            keep_alive: Duration::from_secs(self.executor.keep_alive_secs),
            await_termination: Duration::from_secs(self.executor.await_termination_secs),
            ..ExecutorConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.delay_ms),
        )
    }
}
