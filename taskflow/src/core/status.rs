//! Task status and failure kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a task failure came from.
///
/// Every failure ends up in a [`super::TracedResult`], but the kind records
/// how it was produced so callers can tell a reported business error apart
/// from a fault in the task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The task returned a failure result itself.
    #[default]
    Reported,
    /// The task body returned an error.
    Raised,
    /// An attempt exceeded the configured timeout.
    TimedOut,
    /// The task body panicked.
    Panicked,
    /// The task never ran because a dependency failed.
    Blocked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reported => write!(f, "reported"),
            Self::Raised => write!(f, "raised"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Panicked => write!(f, "panicked"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl FailureKind {
    /// Returns true if a failure of this kind is retried regardless of the
    /// error's own retryable flag.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Raised | Self::TimedOut | Self::Panicked)
    }
}

/// The execution status of a task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting for its dependencies.
    #[default]
    Pending,
    /// Task is currently running.
    Running,
    /// Task produced a successful result.
    Completed,
    /// Task produced a failure result.
    Failed,
    /// Task can never run because a dependency failed.
    Blocked,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl TaskStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Reported.to_string(), "reported");
        assert_eq!(FailureKind::TimedOut.to_string(), "timed_out");
        assert_eq!(FailureKind::Blocked.to_string(), "blocked");
    }

    #[test]
    fn test_failure_kind_transient() {
        assert!(FailureKind::Raised.is_transient());
        assert!(FailureKind::TimedOut.is_transient());
        assert!(!FailureKind::Reported.is_transient());
        assert!(FailureKind::Panicked.is_transient());
        assert!(!FailureKind::Blocked.is_transient());
    }

    #[test]
    fn test_task_status_is_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Blocked.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_serialize() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, r#""completed""#);

        let kind: FailureKind = serde_json::from_str(r#""timed_out""#).unwrap();
        assert_eq!(kind, FailureKind::TimedOut);
    }
}
