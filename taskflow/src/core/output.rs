//! Traced result envelope produced and consumed by every task.

use super::{ExecInfo, ModelInfo, TaskError, TaskStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Either the values produced by a task or the error it failed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Zero or more produced values.
    Success(Vec<T>),
    /// The task failed.
    Failure(TaskError),
}

/// The output of a task execution plus its execution metadata.
///
/// A `TracedResult` is created once per attempt; the retry wrapper stamps
/// the accepted attempt with timing and attempt counts before it lands in a
/// result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedResult<T> {
    /// Values or error.
    pub outcome: Outcome<T>,

    /// Execution metadata.
    #[serde(default)]
    pub exec: ExecInfo,

    /// The model or service that produced the result, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,
}

impl<T> TracedResult<T> {
    /// Creates a successful result with a single value.
    #[must_use]
    pub fn output(value: T) -> Self {
        Self::outputs(vec![value])
    }

    /// Creates a successful result with several values.
    #[must_use]
    pub fn outputs(values: Vec<T>) -> Self {
        Self {
            outcome: Outcome::Success(values),
            exec: ExecInfo::default(),
            model: None,
        }
    }

    /// Creates a successful result with no values.
    #[must_use]
    pub fn empty() -> Self {
        Self::outputs(Vec::new())
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(error: TaskError) -> Self {
        Self {
            outcome: Outcome::Failure(error),
            exec: ExecInfo::default(),
            model: None,
        }
    }

    /// Creates a failed result reported by the task.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::failure(TaskError::reported(message))
    }

    /// Creates a failed result with a rendered cause.
    #[must_use]
    pub fn error_with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::failure(TaskError::reported(message).with_cause(cause))
    }

    /// Creates a failed result for a request that was never sent because its
    /// input was invalid.
    #[must_use]
    pub fn invalid_request(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::failure(TaskError::reported(message).with_cause("invalid request"))
            .with_model(ModelInfo::new(model_id))
    }

    /// Sets the execution metadata.
    #[must_use]
    pub fn with_exec(mut self, exec: ExecInfo) -> Self {
        self.exec = exec;
        self
    }

    /// Sets the model info.
    #[must_use]
    pub fn with_model(mut self, model: ModelInfo) -> Self {
        self.model = Some(model);
        self
    }

    /// Adds to a usage counter.
    #[must_use]
    pub fn with_usage(mut self, key: impl Into<String>, amount: u64) -> Self {
        self.exec.add_usage(key, amount);
        self
    }

    /// Adds an execution annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.exec.annotations.insert(key.into(), value);
        self
    }

    /// Records attempt timing and count.
    pub fn stamp_attempts(&mut self, attempt_time: Duration, total_time: Duration, attempts: u32) {
        self.exec.response_time_ms = Some(super::exec_info::millis(attempt_time));
        self.exec.response_time_total_ms = Some(super::exec_info::millis(total_time));
        self.exec.attempts = attempts;
    }

    /// Returns true if the result holds values.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Returns true if the result holds an error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failure(_))
    }

    /// Returns the status this result represents.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        match &self.outcome {
            Outcome::Success(_) => TaskStatus::Completed,
            Outcome::Failure(err) if err.kind == super::FailureKind::Blocked => TaskStatus::Blocked,
            Outcome::Failure(_) => TaskStatus::Failed,
        }
    }

    /// Returns the produced values, empty for failures.
    #[must_use]
    pub fn values(&self) -> &[T] {
        match &self.outcome {
            Outcome::Success(values) => values,
            Outcome::Failure(_) => &[],
        }
    }

    /// Returns the first produced value.
    #[must_use]
    pub fn first_value(&self) -> Option<&T> {
        self.values().first()
    }

    /// Consumes the result and returns its values, empty for failures.
    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        match self.outcome {
            Outcome::Success(values) => values,
            Outcome::Failure(_) => Vec::new(),
        }
    }

    /// Returns the error, if the result is a failure.
    #[must_use]
    pub fn error_info(&self) -> Option<&TaskError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(err) => Some(err),
        }
    }

    /// Returns the error message, if the result is a failure.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_info().map(|err| err.message.as_str())
    }

    /// Returns the number of attempts recorded.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.exec.attempts
    }

    /// Converts the values without touching any metadata.
    #[must_use]
    pub fn map_values<U>(self, f: impl FnMut(T) -> U) -> TracedResult<U> {
        let outcome = match self.outcome {
            Outcome::Success(values) => Outcome::Success(values.into_iter().map(f).collect()),
            Outcome::Failure(err) => Outcome::Failure(err),
        };
        TracedResult {
            outcome,
            exec: self.exec,
            model: self.model,
        }
    }
}

impl<T> From<TaskError> for TracedResult<T> {
    fn from(error: TaskError) -> Self {
        Self::failure(error)
    }
}
