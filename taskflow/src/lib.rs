//! # Taskflow
//!
//! Dependency-driven execution of async task graphs with traced results.
//!
//! Taskflow provides:
//!
//! - **Traced results**: every task yields values or a failure, plus timing,
//!   attempt counts, usage counters and model metadata
//! - **Plans**: validated task graphs built directly, by linear chaining, or
//!   by fanning several independent tasks into one
//! - **Retries**: exponential backoff with optional jitter and per-attempt
//!   timeouts
//! - **Wavefront execution**: every task whose dependencies succeeded runs
//!   concurrently; tasks downstream of a failure are never attempted
//! - **Monitoring**: start, progress, completion and failure notifications
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use taskflow::prelude::*;
//!
//! let plan = TaskChain::start(task("fetch", || async { Ok(2) }).shared())
//!     .then("double", |n| async move { Ok(n * 2) })?
//!     .into_plan()?;
//!
//! let result = PlanExecutor::default()
//!     .execute(&plan, Arc::new(LoggingMonitor::default()))
//!     .await;
//! assert_eq!(result.final_values(), &[4]);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod monitor;
pub mod observability;
pub mod plan;
pub mod tasks;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::config::{LogFormat, LoggingConfig, TaskflowConfig};
    pub use crate::core::{
        ExecInfo, FailureKind, ModelInfo, Outcome, TaskError, TaskStatus, TaskValue,
        TracedResult,
    };
    pub use crate::errors::{
        ConfigError, ContractErrorInfo, CycleDetectedError, PlanValidationError,
    };
    pub use crate::monitor::{
        CollectingMonitor, LoggingMonitor, Monitor, NoOpMonitor, TeeMonitor,
    };
    pub use crate::observability::init_tracing;
    pub use crate::plan::{
        aggregate, aggregate_with_id, ExecutorConfig, JitterStrategy, PipelineResult, Plan,
        PlanExecutor, Planner, RetryPolicy, StaticPlanner, TaskChain,
    };
    pub use crate::tasks::{
        dependent_task, task, traced_task, FnTask, MonitoredTask, SharedTask, Task, TaskInputs,
    };
}
