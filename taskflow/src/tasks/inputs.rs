//! Dependency results handed to a task.

use crate::core::TracedResult;
use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of the results a task depends on.
///
/// Cloning is cheap: the underlying table is shared, so a retried task can
/// receive the same inputs on every attempt.
#[derive(Debug)]
pub struct TaskInputs<T> {
    task_id: String,
    results: Arc<HashMap<String, TracedResult<T>>>,
}

impl<T> Clone for TaskInputs<T> {
    fn clone(&self) -> Self {
        Self {
            task_id: self.task_id.clone(),
            results: Arc::clone(&self.results),
        }
    }
}

impl<T> Default for TaskInputs<T> {
    fn default() -> Self {
        Self {
            task_id: String::new(),
            results: Arc::new(HashMap::new()),
        }
    }
}

impl<T> TaskInputs<T> {
    /// Creates inputs for a task.
    #[must_use]
    pub fn new(task_id: impl Into<String>, results: HashMap<String, TracedResult<T>>) -> Self {
        Self {
            task_id: task_id.into(),
            results: Arc::new(results),
        }
    }

    /// Returns the id of the task receiving these inputs.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Returns the result of a dependency.
    #[must_use]
    pub fn get(&self, dependency: &str) -> Option<&TracedResult<T>> {
        self.results.get(dependency)
    }

    /// Returns the result of a dependency, or an error naming the missing id.
    pub fn require(&self, dependency: &str) -> anyhow::Result<&TracedResult<T>> {
        self.get(dependency).ok_or_else(|| {
            anyhow!(
                "Task '{}' has no input from '{}'",
                self.task_id,
                dependency
            )
        })
    }

    /// Returns the first value produced by a dependency.
    #[must_use]
    pub fn first_value(&self, dependency: &str) -> Option<&T> {
        self.get(dependency).and_then(TracedResult::first_value)
    }

    /// Returns all values produced by a dependency.
    #[must_use]
    pub fn values(&self, dependency: &str) -> &[T] {
        self.get(dependency)
            .map_or(&[] as &[T], TracedResult::values)
    }

    /// Returns the results for `ids` in the given order, skipping unknown ids.
    #[must_use]
    pub fn ordered<'a>(&'a self, ids: &'a [String]) -> Vec<(&'a str, &'a TracedResult<T>)> {
        ids.iter()
            .filter_map(|id| self.results.get(id).map(|r| (id.as_str(), r)))
            .collect()
    }

    /// Returns the number of dependency results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if the task has no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates over all dependency results in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TracedResult<T>)> {
        self.results.iter().map(|(id, r)| (id.as_str(), r))
    }
}
