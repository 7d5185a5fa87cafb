//! Retry wrapper with exponential backoff and optional jitter.
//!
//! Every task attempt in a plan goes through [`RetryExecutor::execute`],
//! which retries faults, panics, timeouts, and failures the task marked
//! retryable, then stamps the accepted result with attempt timing and counts.

use crate::core::{TaskError, TaskValue, TracedResult};
use crate::errors::ConfigError;
use crate::monitor::Monitor;
use crate::tasks::{Task, TaskInputs};
use chrono::Utc;
use futures::FutureExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Jitter strategy applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
    /// min(max, random(initial, prev * 3))
    Decorrelated,
}

/// How often and how patiently a task is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
    /// Per-attempt timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 1.5,
            max_delay_ms: 60_000,
            jitter: JitterStrategy::None,
            attempt_timeout_ms: None,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that runs every task exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Sets the number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay_ms(mut self, delay: u64) -> Self {
        self.initial_delay_ms = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_attempt_timeout_ms(mut self, timeout: u64) -> Self {
        self.attempt_timeout_ms = Some(timeout);
        self
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    /// Checks that the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: String| ConfigError::Invalid {
            field: field.to_string(),
            reason,
        };
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(invalid(
                "backoff_multiplier",
                format!("must be a finite number >= 1.0, got {}", self.backoff_multiplier),
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(invalid(
                "max_delay_ms",
                format!(
                    "must not be smaller than initial_delay_ms ({} < {})",
                    self.max_delay_ms, self.initial_delay_ms
                ),
            ));
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err(invalid("attempt_timeout_ms", "must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Retry bookkeeping for one task.
#[derive(Debug, Default)]
pub struct RetryState {
    retries: u32,
    previous_delay_ms: Option<u64>,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of retries scheduled so far.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Returns true if no retries remain.
    #[must_use]
    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.retries >= policy.max_retries
    }

    /// Computes the delay before the next retry and counts the retry.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn next_delay(&mut self, policy: &RetryPolicy) -> Duration {
        let initial = policy.initial_delay_ms;
        let max = policy.max_delay_ms;

        let exponent = i32::try_from(self.retries).unwrap_or(i32::MAX);
        let scaled = (initial as f64) * policy.backoff_multiplier.powi(exponent);
        let delay = if scaled.is_finite() && scaled < max as f64 {
            scaled.round() as u64
        } else {
            max
        };

        let jittered = match policy.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
            JitterStrategy::Decorrelated => {
                let prev = self.previous_delay_ms.unwrap_or(initial);
                let upper = prev.saturating_mul(3).min(max);
                if upper <= initial {
                    initial
                } else {
                    rand::thread_rng().gen_range(initial..=upper)
                }
            }
        };

        self.previous_delay_ms = Some(jittered);
        self.retries += 1;
        Duration::from_millis(jittered)
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub struct RetryRun<S> {
    /// The accepted value, or the error of the last attempt.
    pub result: Result<S, TaskError>,
    /// Number of attempts made.
    pub attempts: u32,
    /// Duration of the last attempt.
    pub attempt_time: Duration,
    /// Duration since the first attempt started, including backoff.
    pub total_time: Duration,
}

impl<S> RetryRun<S> {
    /// Returns true if the last attempt produced a value.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor for `policy`.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `op` until it returns `Ok` or retries are exhausted.
    ///
    /// `label` identifies the operation in log events.
    pub async fn run<S, F, Fut>(&self, label: &str, op: F) -> RetryRun<S>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<S>>,
    {
        self.run_until(label, op, |_| None).await
    }

    /// Executes one task attempt loop and stamps the accepted result.
    ///
    /// Attempts that return `Err`, panic, or time out are retried. An attempt that
    /// returns a failed result is retried only when its error is marked
    /// retryable; otherwise it is accepted as is. After the last retry the
    /// final failure is returned, never an `Err`.
    pub async fn execute<T, K>(
        &self,
        task: &K,
        inputs: TaskInputs<T>,
        monitor: Arc<dyn Monitor>,
    ) -> TracedResult<T>
    where
        T: TaskValue,
        K: Task<T> + ?Sized,
    {
        let started_at = Utc::now();
        let run = self
            .run_until(
                task.id(),
                || task.execute(inputs.clone(), Arc::clone(&monitor)),
                |result: &TracedResult<T>| {
                    result
                        .error_info()
                        .filter(|err| err.retryable)
                        .map(ToString::to_string)
                },
            )
            .await;

        let mut result = match run.result {
            Ok(result) => result,
            Err(err) => TracedResult::failure(err),
        };
        result.stamp_attempts(run.attempt_time, run.total_time, run.attempts);
        result.exec.started_at = Some(started_at);
        result
    }

    /// `retry_value` returns a reason when an `Ok` value should be retried.
    async fn run_until<S, F, Fut, R>(&self, label: &str, mut op: F, retry_value: R) -> RetryRun<S>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<S>>,
        R: Fn(&S) -> Option<String>,
    {
        let total = Instant::now();
        let mut state = RetryState::new();

        loop {
            let attempt_start = Instant::now();
            let attempt = AssertUnwindSafe(async { op().await }).catch_unwind();
            let result = match self.policy.attempt_timeout() {
                Some(limit) => match tokio::time::timeout(limit, attempt).await {
                    Ok(outcome) => settle(outcome),
                    Err(_) => Err(TaskError::timed_out(limit)),
                },
                None => settle(attempt.await),
            };
            let attempt_time = attempt_start.elapsed();

            let reason = match &result {
                Ok(value) => retry_value(value),
                Err(err) if err.should_retry() => Some(err.to_string()),
                Err(_) => None,
            };

            let exhausted = state.is_exhausted(&self.policy);
            if reason.is_none() || exhausted {
                if exhausted && reason.is_some() {
                    debug!(task_id = label, attempts = state.retries() + 1, "Retries exhausted");
                }
                return RetryRun {
                    result,
                    attempts: state.retries() + 1,
                    attempt_time,
                    total_time: total.elapsed(),
                };
            }

            let delay = state.next_delay(&self.policy);
            info!(
                task_id = label,
                retry = state.retries(),
                max_retries = self.policy.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = reason.as_deref().unwrap_or_default(),
                "Retrying task"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn settle<S>(outcome: Result<anyhow::Result<S>, Box<dyn Any + Send>>) -> Result<S, TaskError> {
    match outcome {
        Ok(result) => result.map_err(|err| TaskError::raised(&err)),
        Err(payload) => Err(TaskError::panicked(panic_message(payload))),
    }
}

/// Renders a panic payload; `panic!` produces either `&str` or `String`.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "unknown panic payload".to_string(), |s| (*s).to_string()),
    }
}
