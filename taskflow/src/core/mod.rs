//! Core domain model types for taskflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - The traced result envelope and its outcome
//! - Execution and model metadata
//! - Task errors, failure kinds, and statuses

mod error;
mod exec_info;
mod output;
mod status;

use std::fmt::Debug;

pub use error::TaskError;
pub use exec_info::{ExecInfo, ModelInfo};
pub use output::{Outcome, TracedResult};
pub use status::{FailureKind, TaskStatus};

/// Values that can flow between tasks of a plan.
///
/// Results are shared with dependents and monitors across spawned tasks, so
/// values must be cloneable, thread-safe, and printable.
pub trait TaskValue: Clone + Send + Sync + Debug + 'static {}

impl<T> TaskValue for T where T: Clone + Send + Sync + Debug + 'static {}
