//! Testing utilities for taskflow plans.
//!
//! This module provides:
//! - Mock tasks with invocation counters
//! - Test assertions for traced results and runs
//! - A harness running plans with a recording monitor

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_attempts, assert_completed_before, assert_failed, assert_failure_kind,
    assert_succeeded, assert_task_status, assert_values,
};
pub use fixtures::{fast_retry_policy, TestHarness, TestRun};
pub use mocks::{
    ConcurrencyGauge, CountingTask, FailingTask, FailureMode, FlakyTask, SlowTask, ValueTask,
};
