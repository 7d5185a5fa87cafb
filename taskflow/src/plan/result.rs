//! Result of executing a plan.

use crate::core::{TaskStatus, TracedResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Everything a plan run produced.
///
/// `results` holds one entry per attempted task, successful or not. Tasks
/// that were never attempted because a dependency failed appear only in
/// `blocked`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult<T> {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Id of the designated final task.
    pub final_task_id: String,
    /// Result of the final task, or a blocked failure if it never ran.
    pub final_result: TracedResult<T>,
    /// Results of all attempted tasks.
    pub results: HashMap<String, TracedResult<T>>,
    /// Ids of tasks never attempted, in plan order.
    pub blocked: Vec<String>,
}

impl<T> PipelineResult<T> {
    /// Returns true if the final task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.final_result.is_success()
    }

    /// Returns the result of a task, if it was attempted.
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<&TracedResult<T>> {
        self.results.get(task_id)
    }

    /// Returns the status of a task in this run.
    #[must_use]
    pub fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        match self.results.get(task_id) {
            Some(result) => Some(result.status()),
            None if self.blocked.iter().any(|id| id == task_id) => Some(TaskStatus::Blocked),
            None => None,
        }
    }

    /// Returns the ids of successful tasks, sorted.
    #[must_use]
    pub fn completed(&self) -> Vec<&str> {
        self.ids_where(TracedResult::is_success)
    }

    /// Returns the ids of failed tasks, sorted.
    #[must_use]
    pub fn failed(&self) -> Vec<&str> {
        self.ids_where(TracedResult::is_failure)
    }

    /// Returns the final task's values, empty if it failed.
    #[must_use]
    pub fn final_values(&self) -> &[T] {
        self.final_result.values()
    }

    /// Summarizes the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let completed = self.results.values().filter(|r| r.is_success()).count();
        RunSummary {
            run_id: self.run_id,
            total: self.results.len() + self.blocked.len(),
            completed,
            failed: self.results.len() - completed,
            blocked: self.blocked.len(),
            attempts: self.results.values().map(TracedResult::attempts).sum(),
            duration_ms: self.duration_ms,
            success: self.is_success(),
        }
    }

    fn ids_where(&self, predicate: impl Fn(&TracedResult<T>) -> bool) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .results
            .iter()
            .filter(|(_, result)| predicate(result))
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Counts describing a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run id.
    pub run_id: Uuid,
    /// Tasks in the plan.
    pub total: usize,
    /// Tasks that succeeded.
    pub completed: usize,
    /// Tasks that were attempted and failed.
    pub failed: usize,
    /// Tasks never attempted.
    pub blocked: usize,
    /// Attempts across all tasks.
    pub attempts: u32,
    /// Run duration in milliseconds.
    pub duration_ms: f64,
    /// Whether the final task succeeded.
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskError;
    use pretty_assertions::assert_eq;

    fn sample() -> PipelineResult<i32> {
        let mut ok = TracedResult::output(1);
        ok.exec.attempts = 1;
        let mut bad: TracedResult<i32> = TracedResult::error("boom");
        bad.exec.attempts = 3;

        let mut results = HashMap::new();
        results.insert("b".to_string(), ok.clone());
        results.insert("a".to_string(), ok);
        results.insert("c".to_string(), bad);

        PipelineResult {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            duration_ms: 12.5,
            final_task_id: "d".to_string(),
            final_result: TaskError::blocked(&["c".to_string()]).into(),
            results,
            blocked: vec!["d".to_string()],
        }
    }

    #[test]
    fn test_accessors() {
        let result = sample();
        assert!(!result.is_success());
        assert_eq!(result.completed(), vec!["a", "b"]);
        assert_eq!(result.failed(), vec!["c"]);
        assert!(result.get("d").is_none());
        assert!(result.final_values().is_empty());
    }

    #[test]
    fn test_status_of() {
        let result = sample();
        assert_eq!(result.status_of("a"), Some(TaskStatus::Completed));
        assert_eq!(result.status_of("c"), Some(TaskStatus::Failed));
        assert_eq!(result.status_of("d"), Some(TaskStatus::Blocked));
        assert_eq!(result.status_of("zzz"), None);
    }

    #[test]
    fn test_summary() {
        let result = sample();
        let summary = result.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.attempts, 5);
        assert!(!summary.success);
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["final_task_id"], "d");
        assert_eq!(json["blocked"][0], "d");
        assert_eq!(json["final_result"]["outcome"]["failure"]["kind"], "blocked");
    }
}
