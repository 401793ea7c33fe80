use serde::{Deserialize, Serialize};

use super::batching::BatchingConfig;
use super::database::DatabaseConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::netlog::NetLogConfig;

/// Main configuration, loaded from TOML with every section defaulted
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub batching: BatchingConfig,

    #[serde(default)]
    pub netlog: NetLogConfig,
}

/// Values given on the command line take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_path: Option<String>,
    pub log_level: Option<String>,
    pub max_batch_size: Option<usize>,
    pub flush_interval_ms: Option<u64>,
    pub logs_enabled: Option<bool>,
}

impl Config {
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_string(),
                    source,
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply(overrides);
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply(&mut self, overrides: CliOverrides) {
        if let Some(path) = overrides.database_path {
            self.database.path = path;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(size) = overrides.max_batch_size {
            self.batching.max_batch_size = size;
        }
        if let Some(interval) = overrides.flush_interval_ms {
            self.batching.flush_interval_ms = interval;
        }
        if let Some(enabled) = overrides.logs_enabled {
            self.netlog.logs_enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batching.max_batch_size == 0 {
            return Err(ConfigError::Validation(
                "batching.max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.batching.flush_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "batching.flush_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.batching.channel_capacity == 0 || self.batching.worker_queue == 0 {
            return Err(ConfigError::Validation(
                "batching queues need a non-zero capacity".to_string(),
            ));
        }
        if let Some(q) = self
            .netlog
            .quantiles
            .iter()
            .find(|q| !(**q > 0.0 && **q < 1.0))
        {
            return Err(ConfigError::Validation(format!(
                "quantile {q} is outside (0, 1)"
            )));
        }
        if !self.logging.has_known_level() {
            return Err(ConfigError::Validation(format!(
                "unknown logging.level {:?}",
                self.logging.level
            )));
        }
        if self.netlog.ip_cache_capacity == 0 {
            return Err(ConfigError::Validation(
                "netlog.ip_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
