//! Test fixtures for running plans.

use std::sync::Arc;

use crate::core::TaskValue;
use crate::monitor::CollectingMonitor;
use crate::plan::{ExecutorConfig, PipelineResult, Plan, PlanExecutor, RetryPolicy};

/// A retry policy with millisecond delays, for tests.
#[must_use]
pub fn fast_retry_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_retries(max_retries)
        .with_initial_delay_ms(1)
        .with_max_delay_ms(10)
}

/// Runs plans with a recording monitor.
#[derive(Debug, Clone)]
pub struct TestHarness {
    config: ExecutorConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self {
            config: ExecutorConfig::new().with_retry(fast_retry_policy(0)),
        }
    }
}

impl TestHarness {
    /// Creates a harness that never retries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `max_retries` fast retries per task.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.retry.attempt_timeout_ms = Some(timeout);
        self
    }

    /// Limits concurrent tasks.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.config.max_concurrency = Some(limit);
        self
    }

    /// Returns the executor config.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes `plan` and returns the result with the recorded events.
    pub async fn run<T: TaskValue>(&self, plan: &Plan<T>) -> TestRun<T> {
        let monitor = Arc::new(CollectingMonitor::new());
        let result = PlanExecutor::new(self.config.clone())
            .execute(plan, monitor.clone())
            .await;
        TestRun { result, monitor }
    }
}

/// The outcome of a [`TestHarness`] run.
#[derive(Debug)]
pub struct TestRun<T> {
    /// The run result.
    pub result: PipelineResult<T>,
    /// Every monitor notification of the run.
    pub monitor: Arc<CollectingMonitor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::SharedTask;
    use crate::testing::ValueTask;

    #[test]
    fn test_harness_config() {
        let harness = TestHarness::new()
            .with_retries(2)
            .with_attempt_timeout_ms(50)
            .with_max_concurrency(3);

        assert_eq!(harness.config().retry.max_retries, 2);
        assert_eq!(harness.config().retry.initial_delay_ms, 1);
        assert_eq!(harness.config().retry.attempt_timeout_ms, Some(50));
        assert_eq!(harness.config().max_concurrency, Some(3));
    }

    #[tokio::test]
    async fn test_harness_run() {
        let task: SharedTask<i32> = Arc::new(ValueTask::new("v", 1));
        let plan = Plan::new(vec![task]).unwrap();
        let run = TestHarness::new().run(&plan).await;

        assert!(run.result.is_success());
        assert_eq!(run.monitor.started(), vec!["v".to_string()]);
        assert_eq!(run.monitor.completed(), vec!["v".to_string()]);
    }
}
