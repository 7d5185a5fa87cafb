//! Error types for the taskflow engine.
//!
//! Plan construction problems are reported eagerly through
//! [`PlanValidationError`]; task failures never surface here and are carried
//! as data inside a [`crate::core::TracedResult`] instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-004-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a plan fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlanValidationError {
    /// The error message.
    pub message: String,
    /// The task ids involved in the error.
    pub tasks: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PlanValidationError {
    /// Creates a new plan validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tasks: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the tasks involved.
    #[must_use]
    pub fn with_tasks(mut self, tasks: Vec<String>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }

    /// A plan with no tasks.
    #[must_use]
    pub fn empty() -> Self {
        Self::new("Plan has no tasks").with_error_info(
            ContractErrorInfo::new(codes::EMPTY, "Cannot execute an empty plan")
                .with_fix_hint("Add at least one task to the plan."),
        )
    }

    /// Two tasks share an id.
    #[must_use]
    pub fn duplicate(task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        Self::new(format!("Duplicate task id '{task_id}'"))
            .with_tasks(vec![task_id.clone()])
            .with_error_info(
                ContractErrorInfo::new(codes::DUPLICATE, format!("Task id '{task_id}' is used more than once"))
                    .with_fix_hint("Give every task in a plan a unique id."),
            )
    }

    /// A task names a dependency that is not part of the plan.
    #[must_use]
    pub fn missing_dependency(task_id: &str, dependency: &str) -> Self {
        Self::new(format!(
            "Task '{task_id}' depends on unknown task '{dependency}'"
        ))
        .with_tasks(vec![task_id.to_string(), dependency.to_string()])
        .with_error_info(
            ContractErrorInfo::new(codes::MISSING_DEP, format!("Dependency '{dependency}' not found"))
                .with_fix_hint("Ensure every dependency id refers to a task in the same plan."),
        )
    }

    /// A task lists itself as a dependency.
    #[must_use]
    pub fn self_dependency(task_id: &str) -> Self {
        Self::new(format!("Task '{task_id}' cannot depend on itself"))
            .with_tasks(vec![task_id.to_string()])
            .with_error_info(ContractErrorInfo::new(
                codes::CYCLE,
                format!("Task '{task_id}' depends on itself"),
            ))
    }

    /// The designated final task is not part of the plan.
    #[must_use]
    pub fn unknown_final(task_id: &str) -> Self {
        Self::new(format!("Final task '{task_id}' is not part of the plan"))
            .with_tasks(vec![task_id.to_string()])
            .with_error_info(ContractErrorInfo::new(
                codes::UNKNOWN_FINAL,
                format!("Task '{task_id}' not found"),
            ))
    }

    /// Two fan-in inputs depend on each other.
    #[must_use]
    pub fn not_independent(task_id: &str, dependency: &str) -> Self {
        Self::new(format!(
            "Cannot aggregate: task '{task_id}' depends on '{dependency}'"
        ))
        .with_tasks(vec![task_id.to_string(), dependency.to_string()])
        .with_error_info(
            ContractErrorInfo::new(
                codes::NOT_INDEPENDENT,
                "Aggregated tasks must be independent of each other",
            )
            .with_context_entry("task", task_id)
            .with_context_entry("dependency", dependency),
        )
    }
}

/// Error raised when a cycle is detected in the plan graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in plan: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of tasks forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            codes::CYCLE,
            format!("Plan contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

impl From<CycleDetectedError> for PlanValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            tasks: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

/// Error raised when configuration cannot be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("Cannot read configuration file '{path}': {source}")]
    Read {
        /// The file path.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An environment override had an unusable value.
    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv {
        /// The environment variable name.
        key: String,
        /// The offending value.
        value: String,
    },

    /// A value is out of its allowed range.
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// The field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Contract error codes.
pub mod codes {
    /// Dependency cycle.
    pub const CYCLE: &str = "CONTRACT-004-CYCLE";
    /// Dependency on an unknown task.
    pub const MISSING_DEP: &str = "CONTRACT-004-MISSING_DEP";
    /// Duplicate task id.
    pub const DUPLICATE: &str = "CONTRACT-004-DUPLICATE";
    /// Plan without tasks.
    pub const EMPTY: &str = "CONTRACT-004-EMPTY";
    /// Designated final task not in plan.
    pub const UNKNOWN_FINAL: &str = "CONTRACT-004-UNKNOWN_FINAL";
    /// Fan-in over tasks that depend on each other.
    pub const NOT_INDEPENDENT: &str = "CONTRACT-004-NOT_INDEPENDENT";
}

/// Provides default suggestions for common contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            codes::CYCLE => Some(
                "Check your task dependencies for circular references. \
                 Use a linear chain or fan-in aggregation instead.",
            ),
            codes::MISSING_DEP => Some(
                "Ensure all dependencies reference tasks that exist in the plan. \
                 Check for typos in task ids.",
            ),
            codes::DUPLICATE => Some(
                "Task ids must be unique within a plan. Rename one of the tasks.",
            ),
            codes::EMPTY => Some("Add at least one task to the plan before executing it."),
            codes::UNKNOWN_FINAL => Some(
                "The designated final task must be one of the tasks in the plan.",
            ),
            codes::NOT_INDEPENDENT => Some(
                "Fan-in aggregation expects tasks with no dependencies among them.",
            ),
            _ => None,
        }
    }
}
