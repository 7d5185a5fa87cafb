//! Wavefront plan executor.
//!
//! Repeatedly selects every task whose dependencies have all succeeded and
//! that has not run yet, runs that wavefront concurrently through the retry
//! wrapper, and folds the results into the completed and failed tables. The
//! run ends when a wavefront comes up empty. Tasks downstream of a failure
//! are never eligible and so are never attempted.

use super::retry::panic_message;
use super::{Plan, PipelineResult, RetryExecutor, RetryPolicy};
use crate::core::{TaskError, TaskValue, TracedResult};
use crate::monitor::Monitor;
use crate::observability::SpanTimer;
use crate::tasks::{SharedTask, TaskInputs};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Executor settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Retry policy applied to every task.
    pub retry: RetryPolicy,
    /// Maximum tasks running at once; unbounded when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

impl ExecutorConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Limits how many tasks run at once.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }
}

/// Executes validated plans.
#[derive(Debug, Clone, Default)]
pub struct PlanExecutor {
    config: ExecutorConfig,
    retry: RetryExecutor,
}

impl PlanExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        let retry = RetryExecutor::new(config.retry.clone());
        Self { config, retry }
    }

    /// Creates an executor with the given retry policy and no concurrency limit.
    #[must_use]
    pub fn with_retry_policy(policy: RetryPolicy) -> Self {
        Self::new(ExecutorConfig::new().with_retry(policy))
    }

    /// Returns the config.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs every reachable task of `plan` and reports the final task.
    ///
    /// Task failures are data in the returned [`PipelineResult`]; this never
    /// fails for a plan that passed validation.
    pub async fn execute<T: TaskValue>(
        &self,
        plan: &Plan<T>,
        monitor: Arc<dyn Monitor>,
    ) -> PipelineResult<T> {
        let run_id = Uuid::now_v7();
        let span = info_span!("pipeline", %run_id, tasks = plan.len());
        self.run(run_id, plan, monitor).instrument(span).await
    }

    async fn run<T: TaskValue>(
        &self,
        run_id: Uuid,
        plan: &Plan<T>,
        monitor: Arc<dyn Monitor>,
    ) -> PipelineResult<T> {
        let started_at = Utc::now();
        let timer = SpanTimer::start("pipeline");

        let mut completed: HashMap<String, TracedResult<T>> = HashMap::new();
        let mut failed: HashMap<String, TracedResult<T>> = HashMap::new();

        loop {
            let wavefront: Vec<&SharedTask<T>> = plan
                .tasks()
                .iter()
                .filter(|task| {
                    !completed.contains_key(task.id())
                        && !failed.contains_key(task.id())
                        && task.dependencies().iter().all(|dep| completed.contains_key(dep))
                })
                .collect();
            if wavefront.is_empty() {
                break;
            }

            debug!(
                tasks = ?wavefront.iter().map(|task| task.id()).collect::<Vec<_>>(),
                "Dispatching wavefront"
            );

            let limit = self
                .config
                .max_concurrency
                .unwrap_or(wavefront.len())
                .max(1);
            let runs = wavefront.into_iter().map(|task| {
                let inputs = collect_inputs(task, &completed);
                self.run_task(Arc::clone(task), inputs, Arc::clone(&monitor))
            });
            let outcomes: Vec<(String, TracedResult<T>)> =
                stream::iter(runs).buffer_unordered(limit).collect().await;

            for (task_id, result) in outcomes {
                if let Some(err) = result.error_info() {
                    warn!(task_id = %task_id, kind = %err.kind, error = %err, "Task failed");
                    failed.insert(task_id, result);
                } else {
                    completed.insert(task_id, result);
                }
            }
        }

        let blocked: Vec<String> = plan
            .task_ids()
            .filter(|id| !completed.contains_key(*id) && !failed.contains_key(*id))
            .map(ToString::to_string)
            .collect();

        let final_task_id = plan.final_task_id().to_string();
        let final_result = completed
            .get(&final_task_id)
            .or_else(|| failed.get(&final_task_id))
            .cloned()
            .unwrap_or_else(|| {
                let unmet: Vec<String> = plan
                    .task(&final_task_id)
                    .map(|task| {
                        task.dependencies()
                            .iter()
                            .filter(|dep| !completed.contains_key(*dep))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                TaskError::blocked(&unmet).into()
            });

        let duration_ms = timer.finish();
        info!(
            completed = completed.len(),
            failed = failed.len(),
            blocked = blocked.len(),
            success = final_result.is_success(),
            duration_ms,
            "Plan finished"
        );

        let mut results = completed;
        results.extend(failed);

        PipelineResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            final_task_id,
            final_result,
            results,
            blocked,
        }
    }

    /// Runs one task on its own tokio task.
    ///
    /// Panics inside attempts are handled by the retry loop; the join error
    /// branch only covers the stamping code around it. Dropping the returned
    /// future aborts the spawned task.
    fn run_task<T: TaskValue>(
        &self,
        task: SharedTask<T>,
        inputs: TaskInputs<T>,
        monitor: Arc<dyn Monitor>,
    ) -> impl Future<Output = (String, TracedResult<T>)> + Send + 'static {
        let retry = self.retry.clone();
        let task_id = task.id().to_string();
        let span = info_span!("task", task_id = %task_id);

        async move {
            monitor.task_started(&task_id);
            let start = Instant::now();

            let handle = tokio::spawn({
                let monitor = Arc::clone(&monitor);
                async move { retry.execute(task.as_ref(), inputs, monitor).await }.instrument(span)
            });
            let _guard = AbortOnDrop(handle.abort_handle());

            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    let detail = if err.is_panic() {
                        panic_message(err.into_panic())
                    } else {
                        err.to_string()
                    };
                    let mut result = TracedResult::failure(TaskError::panicked(detail));
                    result.stamp_attempts(start.elapsed(), start.elapsed(), 1);
                    result
                }
            };

            match result.error_info() {
                Some(err) => monitor.task_failed(&task_id, err),
                None => monitor.task_completed(&task_id, &result.values()),
            }
            (task_id, result)
        }
    }
}

/// Aborts a spawned task when the run awaiting it is dropped.
struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Dependency results for `task`, cloned out of the completed table.
fn collect_inputs<T: TaskValue>(
    task: &SharedTask<T>,
    completed: &HashMap<String, TracedResult<T>>,
) -> TaskInputs<T> {
    let results = task
        .dependencies()
        .iter()
        .filter_map(|dep| completed.get(dep).map(|result| (dep.clone(), result.clone())))
        .collect();
    TaskInputs::new(task.id(), results)
}
