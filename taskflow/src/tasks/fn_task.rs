//! Closure-backed tasks.

use super::{SharedTask, Task, TaskInputs};
use crate::core::{ExecInfo, TaskValue, TracedResult};
use crate::monitor::Monitor;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

type TaskFn<T> = dyn Fn(TaskInputs<T>, Arc<dyn Monitor>) -> BoxFuture<'static, anyhow::Result<TracedResult<T>>>
    + Send
    + Sync;

/// A task whose body is an async closure.
pub struct FnTask<T> {
    id: String,
    description: Option<String>,
    dependencies: BTreeSet<String>,
    func: Arc<TaskFn<T>>,
}

impl<T: TaskValue> FnTask<T> {
    /// Creates a task with no dependencies from an async closure.
    pub fn new<F, Fut>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn(TaskInputs<T>, Arc<dyn Monitor>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<TracedResult<T>>> + Send + 'static,
    {
        let func = move |inputs: TaskInputs<T>,
                         monitor: Arc<dyn Monitor>|
              -> BoxFuture<'static, anyhow::Result<TracedResult<T>>> {
            Box::pin(func(inputs, monitor))
        };
        Self {
            id: id.into(),
            description: None,
            dependencies: BTreeSet::new(),
            func: Arc::new(func),
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.insert(dep.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Wraps the task for use in a plan.
    #[must_use]
    pub fn shared(self) -> SharedTask<T> {
        Arc::new(self)
    }
}

impl<T> Debug for FnTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

#[async_trait]
impl<T: TaskValue> Task<T> for FnTask<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    async fn execute(
        &self,
        inputs: TaskInputs<T>,
        monitor: Arc<dyn Monitor>,
    ) -> anyhow::Result<TracedResult<T>> {
        (self.func)(inputs, monitor).await
    }
}

/// Creates a task producing a single plain value.
///
/// The value is wrapped in a one-output [`TracedResult`] whose response time
/// covers the closure.
pub fn task<T, F, Fut>(id: impl Into<String>, op: F) -> FnTask<T>
where
    T: TaskValue,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    FnTask::new(id, move |_inputs, _monitor| {
        let started = Instant::now();
        let fut = op();
        async move {
            let value = fut.await?;
            Ok(TracedResult::output(value).with_exec(ExecInfo::duration_since(started)))
        }
    })
}

/// Creates a task whose closure builds its own [`TracedResult`].
pub fn traced_task<T, F, Fut>(id: impl Into<String>, op: F) -> FnTask<T>
where
    T: TaskValue,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<TracedResult<T>>> + Send + 'static,
{
    FnTask::new(id, move |_inputs, _monitor| op())
}

/// Creates a task that depends on `dependencies` and receives their results.
pub fn dependent_task<T, F, Fut>(
    id: impl Into<String>,
    dependencies: impl IntoIterator<Item = impl Into<String>>,
    op: F,
) -> FnTask<T>
where
    T: TaskValue,
    F: Fn(TaskInputs<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<TracedResult<T>>> + Send + 'static,
{
    FnTask::new(id, move |inputs, _monitor| op(inputs)).with_dependencies(dependencies)
}
