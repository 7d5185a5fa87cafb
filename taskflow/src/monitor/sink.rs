//! Monitor trait and implementations.

use crate::core::TaskError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, trace, warn, Level};

/// Observer notified as tasks start, progress, complete, and fail.
///
/// Monitors are called synchronously from the executor and from task
/// bodies. They observe only: nothing a monitor does can change which task
/// runs next.
pub trait Monitor: Send + Sync {
    /// A task is about to run.
    fn task_started(&self, task_id: &str);

    /// A task reported fractional progress in `0.0..=1.0`.
    fn task_update(&self, task_id: &str, progress: f64);

    /// A task produced a successful result.
    fn task_completed(&self, task_id: &str, result: &dyn Debug);

    /// A task produced a failure.
    fn task_failed(&self, task_id: &str, error: &TaskError);
}

/// A monitor that discards all notifications.
///
/// Used for silent execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMonitor;

impl Monitor for NoOpMonitor {
    fn task_started(&self, _task_id: &str) {}

    fn task_update(&self, _task_id: &str, _progress: f64) {}

    fn task_completed(&self, _task_id: &str, _result: &dyn Debug) {}

    fn task_failed(&self, _task_id: &str, _error: &TaskError) {}
}

/// A monitor that logs notifications using the tracing framework.
///
/// Start, progress, and completion are logged at the configured level;
/// failures are always logged at `WARN`.
#[derive(Debug, Clone)]
pub struct LoggingMonitor {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingMonitor {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingMonitor {
    /// Creates a new logging monitor with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging monitor.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging monitor.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log(&self, task_id: &str, message: &str, detail: &dyn Debug) {
        match self.level {
            Level::TRACE => trace!(task_id, detail = ?detail, "{}", message),
            Level::DEBUG => debug!(task_id, detail = ?detail, "{}", message),
            _ => info!(task_id, detail = ?detail, "{}", message),
        }
    }
}

impl Monitor for LoggingMonitor {
    fn task_started(&self, task_id: &str) {
        self.log(task_id, "Task started", &());
    }

    fn task_update(&self, task_id: &str, progress: f64) {
        self.log(task_id, "Task progress", &progress);
    }

    fn task_completed(&self, task_id: &str, result: &dyn Debug) {
        self.log(task_id, "Task completed", result);
    }

    fn task_failed(&self, task_id: &str, error: &TaskError) {
        warn!(
            task_id,
            error = %error,
            kind = %error.kind,
            cause = ?error.cause,
            "Task failed"
        );
    }
}

/// The kind of a recorded monitor notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEventKind {
    /// The task started.
    Started,
    /// The task reported progress.
    Progress {
        /// Fraction complete.
        progress: f64,
    },
    /// The task completed; holds the debug rendering of its result.
    Completed {
        /// Debug rendering of the result.
        result: String,
    },
    /// The task failed.
    Failed {
        /// The error.
        error: TaskError,
    },
}

/// A recorded monitor notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorEvent {
    /// The task the notification was about.
    pub task_id: String,
    /// What happened.
    pub kind: MonitorEventKind,
    /// When it was recorded.
    pub at: DateTime<Utc>,
}

/// A monitor that records every notification in order.
///
/// Useful in tests and for hosts that replay progress into a UI.
#[derive(Debug, Default)]
pub struct CollectingMonitor {
    events: RwLock<Vec<MonitorEvent>>,
}

impl CollectingMonitor {
    /// Creates a new collecting monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.read().clone()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the events recorded for one task.
    #[must_use]
    pub fn events_for(&self, task_id: &str) -> Vec<MonitorEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Returns the ids of started tasks, in start order.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        self.ids_where(|kind| matches!(kind, MonitorEventKind::Started))
    }

    /// Returns the ids of completed tasks, in completion order.
    #[must_use]
    pub fn completed(&self) -> Vec<String> {
        self.ids_where(|kind| matches!(kind, MonitorEventKind::Completed { .. }))
    }

    /// Returns the ids of failed tasks, in failure order.
    #[must_use]
    pub fn failed(&self) -> Vec<String> {
        self.ids_where(|kind| matches!(kind, MonitorEventKind::Failed { .. }))
    }

    /// Returns the index of the first event matching a task and predicate.
    #[must_use]
    pub fn position(
        &self,
        task_id: &str,
        predicate: impl Fn(&MonitorEventKind) -> bool,
    ) -> Option<usize> {
        self.events
            .read()
            .iter()
            .position(|e| e.task_id == task_id && predicate(&e.kind))
    }

    fn ids_where(&self, predicate: impl Fn(&MonitorEventKind) -> bool) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter(|e| predicate(&e.kind))
            .map(|e| e.task_id.clone())
            .collect()
    }

    fn record(&self, task_id: &str, kind: MonitorEventKind) {
        self.events.write().push(MonitorEvent {
            task_id: task_id.to_string(),
            kind,
            at: Utc::now(),
        });
    }
}

impl Monitor for CollectingMonitor {
    fn task_started(&self, task_id: &str) {
        self.record(task_id, MonitorEventKind::Started);
    }

    fn task_update(&self, task_id: &str, progress: f64) {
        self.record(task_id, MonitorEventKind::Progress { progress });
    }

    fn task_completed(&self, task_id: &str, result: &dyn Debug) {
        self.record(
            task_id,
            MonitorEventKind::Completed {
                result: format!("{result:?}"),
            },
        );
    }

    fn task_failed(&self, task_id: &str, error: &TaskError) {
        self.record(
            task_id,
            MonitorEventKind::Failed {
                error: error.clone(),
            },
        );
    }
}
