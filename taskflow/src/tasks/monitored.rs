//! Task wrapper that observes produced values.

use super::{SharedTask, Task, TaskInputs};
use crate::core::{TaskValue, TracedResult};
use crate::monitor::Monitor;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt::{self, Debug};
use std::sync::Arc;

type ValuesCallback<T> = dyn Fn(&[T]) + Send + Sync;

/// Wraps a task and hands its values to a callback whenever an attempt
/// succeeds.
///
/// The wrapper keeps the inner task's id and dependencies, so it can replace
/// the inner task in a plan without touching anything that depends on it.
pub struct MonitoredTask<T> {
    inner: SharedTask<T>,
    callback: Arc<ValuesCallback<T>>,
}

impl<T: TaskValue> MonitoredTask<T> {
    /// Wraps `inner`.
    pub fn new(inner: SharedTask<T>, callback: impl Fn(&[T]) + Send + Sync + 'static) -> Self {
        Self {
            inner,
            callback: Arc::new(callback),
        }
    }

    /// Returns the wrapped task.
    #[must_use]
    pub fn inner(&self) -> &SharedTask<T> {
        &self.inner
    }
}

impl<T> Debug for MonitoredTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoredTask")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: TaskValue> Task<T> for MonitoredTask<T> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn description(&self) -> Option<&str> {
        self.inner.description()
    }

    fn dependencies(&self) -> &BTreeSet<String> {
        self.inner.dependencies()
    }

    async fn execute(
        &self,
        inputs: TaskInputs<T>,
        monitor: Arc<dyn Monitor>,
    ) -> anyhow::Result<TracedResult<T>> {
        let result = self.inner.execute(inputs, monitor).await?;
        if result.is_success() {
            (self.callback)(result.values());
        }
        Ok(result)
    }
}
