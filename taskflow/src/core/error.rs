//! Task error description carried by failed results.

use super::FailureKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Description of why a task failed.
///
/// Unlike [`crate::errors::PlanValidationError`] this is plain data: it is cloned
/// into result tables and monitor notifications and can be serialized with
/// the rest of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TaskError {
    /// Human readable error message.
    pub message: String,
    /// Rendered chain of underlying causes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// How the failure was produced.
    #[serde(default)]
    pub kind: FailureKind,
    /// Whether a reported failure asks to be retried.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl TaskError {
    /// Creates a failure reported by the task itself.
    #[must_use]
    pub fn reported(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
            kind: FailureKind::Reported,
            retryable: false,
        }
    }

    /// Creates a failure from an error returned by a task body.
    #[must_use]
    pub fn raised(err: &anyhow::Error) -> Self {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        Self {
            message: err.to_string(),
            cause: if causes.is_empty() {
                None
            } else {
                Some(causes.join(": "))
            },
            kind: FailureKind::Raised,
            retryable: false,
        }
    }

    /// Creates a failure for an attempt that exceeded its timeout.
    #[must_use]
    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            message: format!("Attempt timed out after {}ms", timeout.as_millis()),
            cause: None,
            kind: FailureKind::TimedOut,
            retryable: false,
        }
    }

    /// Creates a failure for a task body that panicked.
    #[must_use]
    pub fn panicked(detail: impl Into<String>) -> Self {
        Self {
            message: "Task panicked".to_string(),
            cause: Some(detail.into()),
            kind: FailureKind::Panicked,
            retryable: false,
        }
    }

    /// Creates a failure for a task that never ran.
    #[must_use]
    ///
    /// `unmet_dependencies` lists the direct dependencies that did not
    /// complete, whether they failed or were blocked themselves.
    pub fn blocked(unmet_dependencies: &[String]) -> Self {
        Self {
            message: format!(
                "Task was not attempted; unmet dependencies: {}",
                unmet_dependencies.join(", ")
            ),
            cause: None,
            kind: FailureKind::Blocked,
            retryable: false,
        }
    }

    /// Attaches a cause description.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Marks the failure as retryable.
    #[must_use]
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Returns true if a retry wrapper should attempt the task again.
    #[must_use]
    pub fn should_retry(&self) -> bool {
        self.retryable || self.kind.is_transient()
    }
}
