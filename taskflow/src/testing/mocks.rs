//! Mock tasks for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{TaskError, TaskValue, TracedResult};
use crate::monitor::Monitor;
use crate::tasks::{SharedTask, Task, TaskInputs};

fn dependency_set(deps: impl IntoIterator<Item = impl Into<String>>) -> BTreeSet<String> {
    deps.into_iter().map(Into::into).collect()
}

/// A task that returns fixed values and counts its invocations.
#[derive(Debug)]
pub struct ValueTask<T> {
    id: String,
    dependencies: BTreeSet<String>,
    values: Vec<T>,
    calls: AtomicUsize,
    seen_inputs: Mutex<Vec<Vec<String>>>,
}

impl<T: TaskValue> ValueTask<T> {
    /// Creates a task producing a single value.
    #[must_use]
    pub fn new(id: impl Into<String>, value: T) -> Self {
        Self::with_values(id, vec![value])
    }

    /// Creates a task producing several values.
    #[must_use]
    pub fn with_values(id: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            id: id.into(),
            dependencies: BTreeSet::new(),
            values,
            calls: AtomicUsize::new(0),
            seen_inputs: Mutex::new(Vec::new()),
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = dependency_set(deps);
        self
    }

    /// Returns the number of times the task ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the sorted input ids seen on each call.
    #[must_use]
    pub fn seen_inputs(&self) -> Vec<Vec<String>> {
        self.seen_inputs.lock().clone()
    }
}

#[async_trait]
impl<T: TaskValue> Task<T> for ValueTask<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    async fn execute(
        &self,
        inputs: TaskInputs<T>,
        _monitor: Arc<dyn Monitor>,
    ) -> anyhow::Result<TracedResult<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut ids: Vec<String> = inputs.iter().map(|(id, _)| id.to_string()).collect();
        ids.sort();
        self.seen_inputs.lock().push(ids);
        Ok(TracedResult::outputs(self.values.clone()))
    }
}

/// Wraps a task and counts how often it runs.
#[derive(Debug)]
pub struct CountingTask<T> {
    inner: SharedTask<T>,
    calls: Arc<AtomicUsize>,
}

impl<T: TaskValue> CountingTask<T> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: SharedTask<T>) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns a handle to the counter that outlives the task.
    #[must_use]
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Returns the number of times the task ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: TaskValue> Task<T> for CountingTask<T> {
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(inputs, monitor).await
    }
}

/// A task whose first attempts return an error before it succeeds.
#[derive(Debug)]
pub struct FlakyTask<T> {
    id: String,
    dependencies: BTreeSet<String>,
    failures: usize,
    value: T,
    calls: AtomicUsize,
}

impl<T: TaskValue> FlakyTask<T> {
    /// Creates a task failing `failures` times before returning `value`.
    #[must_use]
    pub fn new(id: impl Into<String>, failures: usize, value: T) -> Self {
        Self {
            id: id.into(),
            dependencies: BTreeSet::new(),
            failures,
            value,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = dependency_set(deps);
        self
    }

    /// Returns the number of times the task ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: TaskValue> Task<T> for FlakyTask<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    async fn execute(
        &self,
        _inputs: TaskInputs<T>,
        _monitor: Arc<dyn Monitor>,
    ) -> anyhow::Result<TracedResult<T>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            anyhow::bail!("{} failed on attempt {call}", self.id);
        }
        Ok(TracedResult::output(self.value.clone()))
    }
}

/// How a [`FailingTask`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Returns a non-retryable failure result.
    Reported,
    /// Returns a failure result marked retryable.
    RetryableReported,
    /// Returns an error from the body.
    Raised,
    /// Panics.
    Panic,
}

/// A task that always fails.
#[derive(Debug)]
pub struct FailingTask {
    id: String,
    dependencies: BTreeSet<String>,
    message: String,
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingTask {
    /// Creates a task reporting a non-retryable failure.
    #[must_use]
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_mode(id, message, FailureMode::Reported)
    }

    /// Creates a task failing in the given way.
    #[must_use]
    pub fn with_mode(id: impl Into<String>, message: impl Into<String>, mode: FailureMode) -> Self {
        Self {
            id: id.into(),
            dependencies: BTreeSet::new(),
            message: message.into(),
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = dependency_set(deps);
        self
    }

    /// Returns the number of times the task ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: TaskValue> Task<T> for FailingTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    #[allow(clippy::panic)]
    async fn execute(
        &self,
        _inputs: TaskInputs<T>,
        _monitor: Arc<dyn Monitor>,
    ) -> anyhow::Result<TracedResult<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::Reported => Ok(TracedResult::error(self.message.clone())),
            FailureMode::RetryableReported => Ok(TracedResult::failure(
                TaskError::reported(self.message.clone()).retryable(),
            )),
            FailureMode::Raised => Err(anyhow::anyhow!(self.message.clone())),
            FailureMode::Panic => panic!("{}", self.message),
        }
    }
}

/// Tracks how many tasks run at the same time.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    /// Creates a gauge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the highest number of concurrent runs observed.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A task that sleeps before returning its value.
#[derive(Debug)]
pub struct SlowTask<T> {
    id: String,
    dependencies: BTreeSet<String>,
    delay: Duration,
    value: T,
    gauge: Option<Arc<ConcurrencyGauge>>,
}

impl<T: TaskValue> SlowTask<T> {
    /// Creates a slow task.
    #[must_use]
    pub fn new(id: impl Into<String>, delay: Duration, value: T) -> Self {
        Self {
            id: id.into(),
            dependencies: BTreeSet::new(),
            delay,
            value,
            gauge: None,
        }
    }

    /// Creates a slow task with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(id: impl Into<String>, ms: u64, value: T) -> Self {
        Self::new(id, Duration::from_millis(ms), value)
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn depends_on(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = dependency_set(deps);
        self
    }

    /// Reports every run to `gauge`.
    #[must_use]
    pub fn with_gauge(mut self, gauge: Arc<ConcurrencyGauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }
}

#[async_trait]
impl<T: TaskValue> Task<T> for SlowTask<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    async fn execute(
        &self,
        _inputs: TaskInputs<T>,
        _monitor: Arc<dyn Monitor>,
    ) -> anyhow::Result<TracedResult<T>> {
        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        tokio::time::sleep(self.delay).await;
        if let Some(gauge) = &self.gauge {
            gauge.exit();
        }
        Ok(TracedResult::output(self.value.clone()))
    }
}
