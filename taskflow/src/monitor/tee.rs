//! Fan-out monitor.

use super::Monitor;
use crate::core::TaskError;
use std::fmt::Debug;
use std::sync::Arc;

/// Forwards every notification to each wrapped monitor in order.
///
/// Lets a host combine, for example, a progress binder with a
/// [`super::LoggingMonitor`].
#[derive(Clone, Default)]
pub struct TeeMonitor {
    monitors: Vec<Arc<dyn Monitor>>,
}

impl TeeMonitor {
    /// Creates an empty tee.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a monitor.
    #[must_use]
    pub fn with(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    /// Returns the number of wrapped monitors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Returns true if no monitors are wrapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl std::fmt::Debug for TeeMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeMonitor")
            .field("monitors", &self.monitors.len())
            .finish()
    }
}

impl Monitor for TeeMonitor {
    fn task_started(&self, task_id: &str) {
        for monitor in &self.monitors {
            monitor.task_started(task_id);
        }
    }

    fn task_update(&self, task_id: &str, progress: f64) {
        for monitor in &self.monitors {
            monitor.task_update(task_id, progress);
        }
    }

    fn task_completed(&self, task_id: &str, result: &dyn Debug) {
        for monitor in &self.monitors {
            monitor.task_completed(task_id, result);
        }
    }

    fn task_failed(&self, task_id: &str, error: &TaskError) {
        for monitor in &self.monitors {
            monitor.task_failed(task_id, error);
        }
    }
}
