//! Test assertions for traced results and plan runs.

use std::fmt::Debug;

use crate::core::{FailureKind, TaskStatus, TracedResult};
use crate::monitor::{CollectingMonitor, MonitorEventKind};
use crate::plan::PipelineResult;

/// Asserts that the result is a success.
pub fn assert_succeeded<T: Debug>(result: &TracedResult<T>) {
    assert!(
        result.is_success(),
        "Expected success, got error: {:?}",
        result.error_message()
    );
}

/// Asserts that the result is a failure.
pub fn assert_failed<T: Debug>(result: &TracedResult<T>) {
    assert!(
        result.is_failure(),
        "Expected failure, got values: {:?}",
        result.values()
    );
}

/// Asserts that the result failed with the given kind.
pub fn assert_failure_kind<T: Debug>(result: &TracedResult<T>, expected: FailureKind) {
    let actual = result.error_info().map(|err| err.kind);
    assert_eq!(
        actual,
        Some(expected),
        "Expected failure of kind {expected:?}, got {actual:?}"
    );
}

/// Asserts the produced values.
pub fn assert_values<T: Debug + PartialEq>(result: &TracedResult<T>, expected: &[T]) {
    assert_eq!(result.values(), expected, "Unexpected values");
}

/// Asserts the recorded attempt count.
pub fn assert_attempts<T>(result: &TracedResult<T>, expected: u32) {
    assert_eq!(
        result.attempts(),
        expected,
        "Expected {expected} attempts, got {}",
        result.attempts()
    );
}

/// Asserts a task's status within a run.
pub fn assert_task_status<T>(run: &PipelineResult<T>, task_id: &str, expected: TaskStatus) {
    assert_eq!(
        run.status_of(task_id),
        Some(expected),
        "Unexpected status for task '{task_id}'"
    );
}

/// Asserts that `first` completed before `second` started.
pub fn assert_completed_before(monitor: &CollectingMonitor, first: &str, second: &str) {
    let done = monitor.position(first, |kind| matches!(kind, MonitorEventKind::Completed { .. }));
    let started = monitor.position(second, |kind| matches!(kind, MonitorEventKind::Started));
    match (done, started) {
        (Some(done), Some(started)) => assert!(
            done < started,
            "Expected '{first}' to complete before '{second}' started"
        ),
        _ => panic!("Missing events: '{first}' completed at {done:?}, '{second}' started at {started:?}"),
    }
}
