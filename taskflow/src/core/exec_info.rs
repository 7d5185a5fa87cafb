//! Execution metadata attached to every traced result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Timing, attempt, and usage details for one task execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecInfo {
    /// Duration of the attempt that produced the result, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,

    /// Duration across all attempts, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_total_ms: Option<f64>,

    /// Number of attempts made. Zero until stamped by a retry wrapper.
    #[serde(default)]
    pub attempts: u32,

    /// Quantities consumed, such as token counts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub usage: BTreeMap<String, u64>,

    /// Free-form execution annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, serde_json::Value>,

    /// When the first attempt started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl ExecInfo {
    /// Creates empty execution info.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates execution info whose response time is the time elapsed since `start`.
    #[must_use]
    pub fn duration_since(start: Instant) -> Self {
        Self {
            response_time_ms: Some(millis(start.elapsed())),
            ..Self::default()
        }
    }

    /// Returns the attempt duration.
    #[must_use]
    pub fn response_time(&self) -> Option<Duration> {
        self.response_time_ms.map(|ms| Duration::from_secs_f64(ms / 1000.0))
    }

    /// Returns the cumulative duration.
    #[must_use]
    pub fn response_time_total(&self) -> Option<Duration> {
        self.response_time_total_ms
            .map(|ms| Duration::from_secs_f64(ms / 1000.0))
    }

    /// Adds to a usage counter.
    pub fn add_usage(&mut self, key: impl Into<String>, amount: u64) {
        let counter = self.usage.entry(key.into()).or_insert(0);
        *counter = counter.saturating_add(amount);
    }

    /// Returns a usage counter, or zero.
    #[must_use]
    pub fn usage_of(&self, key: &str) -> u64 {
        self.usage.get(key).copied().unwrap_or(0)
    }
}

/// Identifies the backing model or service used by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// The model identifier.
    pub model_id: String,
    /// Parameters the model was invoked with.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ModelInfo {
    /// Creates model info with no parameters.
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
