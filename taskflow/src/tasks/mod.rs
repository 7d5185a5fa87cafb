//! Task trait and implementations.
//!
//! Tasks are the units of work in a taskflow plan. Each task names the tasks
//! it depends on and, once they have all succeeded, turns their results into
//! a [`TracedResult`] of its own.

mod fn_task;
mod inputs;
mod monitored;

use crate::core::TracedResult;
use crate::monitor::Monitor;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

pub use fn_task::{dependent_task, task, traced_task, FnTask};
pub use inputs::TaskInputs;
pub use monitored::MonitoredTask;

/// A shared, type-erased task.
pub type SharedTask<T> = Arc<dyn Task<T>>;

/// Trait for plan tasks.
///
/// `execute` is only ever called once every dependency has produced a
/// successful result, and `inputs` holds exactly those results.
///
/// Returning `Ok` with a failed [`TracedResult`] reports a business-logic
/// failure. Returning `Err` signals a fault in the body; the retry wrapper
/// treats it as transient.
#[async_trait]
pub trait Task<T>: Send + Sync + Debug {
    /// Returns the task id, unique within a plan.
    fn id(&self) -> &str;

    /// Returns a human-readable description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Returns the ids of the tasks this task depends on.
    fn dependencies(&self) -> &BTreeSet<String>;

    /// Executes the task.
    async fn execute(
        &self,
        inputs: TaskInputs<T>,
        monitor: Arc<dyn Monitor>,
    ) -> anyhow::Result<TracedResult<T>>;
}
