//! Plan building and execution.
//!
//! This module provides:
//! - Validated task graphs and planners
//! - Linear chaining and fan-in aggregation
//! - The retry wrapper
//! - The wavefront executor and its results

mod builder;
mod executor;
mod graph;
#[cfg(test)]
mod integration_tests;
mod result;
mod retry;

pub use builder::{aggregate, aggregate_with_id, TaskChain, DEFAULT_AGGREGATE_ID};
pub use executor::{ExecutorConfig, PlanExecutor};
pub use graph::{Plan, Planner, StaticPlanner};
pub use result::{PipelineResult, RunSummary};
pub use retry::{JitterStrategy, RetryExecutor, RetryPolicy, RetryRun, RetryState};
