//! Runtime configuration.
//!
//! A [`TaskflowConfig`] is read from JSON (a string or a file) and can then be
//! adjusted from `TASKFLOW_*` environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `TASKFLOW_MAX_RETRIES` | `retry.max_retries` |
//! | `TASKFLOW_INITIAL_DELAY_MS` | `retry.initial_delay_ms` |
//! | `TASKFLOW_BACKOFF` | `retry.backoff_multiplier` |
//! | `TASKFLOW_TASK_TIMEOUT_MS` | `retry.attempt_timeout_ms` |
//! | `TASKFLOW_MAX_CONCURRENCY` | `max_concurrency` |
//! | `TASKFLOW_LOG_FORMAT` | `logging.format` |

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;
use crate::plan::{ExecutorConfig, RetryPolicy};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `taskflow=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Whether events include their target module.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Sets the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskflowConfig {
    /// Retry policy applied to every task.
    pub retry: RetryPolicy,
    /// Maximum tasks running at once; unbounded when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl TaskflowConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_json_str(&json)
    }

    /// Applies `TASKFLOW_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides resolved through `lookup`, then re-validates.
    ///
    /// On error `self` is left unchanged.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut next = self.clone();
        if let Some(v) = parse_var(&lookup, "TASKFLOW_MAX_RETRIES")? {
            next.retry.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "TASKFLOW_INITIAL_DELAY_MS")? {
            next.retry.initial_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "TASKFLOW_BACKOFF")? {
            next.retry.backoff_multiplier = v;
        }
        if let Some(v) = parse_var(&lookup, "TASKFLOW_TASK_TIMEOUT_MS")? {
            next.retry.attempt_timeout_ms = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "TASKFLOW_MAX_CONCURRENCY")? {
            next.max_concurrency = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "TASKFLOW_LOG_FORMAT")? {
            next.logging.format = v;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the executor settings.
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            retry: self.retry.clone(),
            max_concurrency: self.max_concurrency,
        }
    }
}

fn parse_var<F, V>(lookup: &F, key: &str) -> Result<Option<V>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    V: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw,
        })
}
