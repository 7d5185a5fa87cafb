//! Linear chaining and fan-in aggregation.

use super::{Plan, Planner};
use crate::core::{ExecInfo, TaskValue, TracedResult};
use crate::errors::PlanValidationError;
use crate::tasks::{dependent_task, SharedTask, TaskInputs};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Id given to the synthetic task created by [`aggregate`].
pub const DEFAULT_AGGREGATE_ID: &str = "aggregate";

/// A plan under construction whose last task is the "tail" that the next
/// chained task consumes.
///
/// Every builder method validates ids eagerly, so a chain that was built
/// successfully always yields a valid [`Plan`].
pub struct TaskChain<T> {
    tasks: Vec<SharedTask<T>>,
    ids: HashSet<String>,
}

impl<T: TaskValue> TaskChain<T> {
    /// Starts a chain with a single task.
    #[must_use]
    pub fn start(task: SharedTask<T>) -> Self {
        let ids = HashSet::from([task.id().to_string()]);
        Self {
            tasks: vec![task],
            ids,
        }
    }

    /// Builds a chain from existing tasks; the last one becomes the tail.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or contains duplicate ids.
    pub fn from_tasks(tasks: Vec<SharedTask<T>>) -> Result<Self, PlanValidationError> {
        let mut iter = tasks.into_iter();
        let first = iter.next().ok_or_else(PlanValidationError::empty)?;
        iter.try_fold(Self::start(first), Self::push)
    }

    /// Returns the current tail task.
    #[must_use]
    pub fn last_task(&self) -> &SharedTask<T> {
        // `tasks` always holds at least the starting task.
        &self.tasks[self.tasks.len() - 1]
    }

    /// Returns the id of the current tail task.
    #[must_use]
    pub fn last_task_id(&self) -> &str {
        self.last_task().id()
    }

    /// Returns the number of tasks in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false; a chain starts with one task.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Appends a task computing one value from the tail's first value.
    ///
    /// The returned value becomes the single output of the new task.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is already used in the chain.
    pub fn then<F, Fut>(self, id: impl Into<String>, op: F) -> Result<Self, PlanValidationError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.then_traced(id, move |value| {
            let started = Instant::now();
            let fut = op(value);
            async move {
                let output = fut.await?;
                Ok(TracedResult::output(output).with_exec(ExecInfo::duration_since(started)))
            }
        })
    }

    /// Appends a task that receives the tail's first value and returns its
    /// own traced result.
    ///
    /// If the tail succeeded without producing any value the new task fails
    /// without calling `op`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is already used in the chain.
    pub fn then_traced<F, Fut>(self, id: impl Into<String>, op: F) -> Result<Self, PlanValidationError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<TracedResult<T>>> + Send + 'static,
    {
        let tail = self.last_task_id().to_string();
        let op = Arc::new(op);
        let task = dependent_task(id, [tail.clone()], move |inputs: TaskInputs<T>| {
            let op = Arc::clone(&op);
            let value = inputs.first_value(&tail).cloned();
            let tail = tail.clone();
            async move {
                match value {
                    Some(value) => op(value).await,
                    None => Ok(TracedResult::error(format!(
                        "Task '{tail}' produced no values"
                    ))),
                }
            }
        });
        self.push(task.shared())
    }

    /// Appends a task that receives every value produced by the tail.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is already used in the chain.
    pub fn then_on_list<F, Fut>(self, id: impl Into<String>, op: F) -> Result<Self, PlanValidationError>
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<TracedResult<T>>> + Send + 'static,
    {
        let tail = self.last_task_id().to_string();
        let task = dependent_task(id, [tail.clone()], move |inputs: TaskInputs<T>| {
            op(inputs.values(&tail).to_vec())
        });
        self.push(task.shared())
    }

    /// Appends a prebuilt task, which must depend on the current tail.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken, the task does not depend on the
    /// tail, or it depends on a task outside the chain.
    pub fn then_task(self, task: SharedTask<T>) -> Result<Self, PlanValidationError> {
        let tail = self.last_task_id();
        if !task.dependencies().contains(tail) {
            return Err(PlanValidationError::missing_dependency(task.id(), tail));
        }
        if let Some(unknown) = task.dependencies().iter().find(|dep| !self.ids.contains(*dep)) {
            return Err(PlanValidationError::missing_dependency(task.id(), unknown));
        }
        self.push(task)
    }

    /// Validates the chain into a plan whose final task is the tail.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain's tasks depend on tasks outside it.
    pub fn into_plan(self) -> Result<Plan<T>, PlanValidationError> {
        let tail = self.last_task_id().to_string();
        Plan::new(self.tasks)?.with_final_task(tail)
    }

    fn push(mut self, task: SharedTask<T>) -> Result<Self, PlanValidationError> {
        if !self.ids.insert(task.id().to_string()) {
            return Err(PlanValidationError::duplicate(task.id()));
        }
        self.tasks.push(task);
        Ok(self)
    }
}

impl<T: TaskValue> Planner<T> for TaskChain<T> {
    fn plan(&self) -> Vec<SharedTask<T>> {
        self.tasks.clone()
    }
}

impl<T> fmt::Debug for TaskChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|task| task.id().to_string()))
            .finish()
    }
}

/// Fans independent tasks into a synthetic [`DEFAULT_AGGREGATE_ID`] task.
///
/// See [`aggregate_with_id`].
///
/// # Errors
///
/// Returns an error under the same conditions as [`aggregate_with_id`].
pub fn aggregate<T: TaskValue>(tasks: Vec<SharedTask<T>>) -> Result<TaskChain<T>, PlanValidationError> {
    aggregate_with_id(DEFAULT_AGGREGATE_ID, tasks)
}

/// Fans independent tasks into a synthetic task with the given id.
///
/// The synthetic task depends on every input and outputs every value of
/// each input, grouped by input in the order the inputs were supplied. An
/// input with no values contributes nothing. The synthetic task becomes the
/// tail of the returned chain.
///
/// # Errors
///
/// Returns an error if `tasks` is empty, if any two ids collide (including
/// the synthetic id), or if one input depends on another.
pub fn aggregate_with_id<T: TaskValue>(
    id: impl Into<String>,
    tasks: Vec<SharedTask<T>>,
) -> Result<TaskChain<T>, PlanValidationError> {
    let id = id.into();
    if tasks.is_empty() {
        return Err(PlanValidationError::empty());
    }

    let order: Vec<String> = tasks.iter().map(|task| task.id().to_string()).collect();
    let members: HashSet<&str> = order.iter().map(String::as_str).collect();
    for task in &tasks {
        if let Some(dep) = task.dependencies().iter().find(|dep| members.contains(dep.as_str())) {
            return Err(PlanValidationError::not_independent(task.id(), dep));
        }
    }

    let chain = TaskChain::from_tasks(tasks)?;
    let fan_in = dependent_task(id, order.clone(), move |inputs: TaskInputs<T>| {
        let values: Vec<T> = inputs
            .ordered(&order)
            .into_iter()
            .flat_map(|(_, result)| result.values().iter().cloned())
            .collect();
        async move { Ok(TracedResult::outputs(values)) }
    });
    chain.push(fan_in.shared())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes;
    use crate::monitor::NoOpMonitor;
    use crate::tasks::{task, traced_task, Task};
    use std::collections::HashMap;

    fn leaf(id: &str, value: i32) -> SharedTask<i32> {
        task(id, move || async move { Ok(value) }).shared()
    }

    #[test]
    fn test_chain_ids_and_dependencies() {
        let chain = TaskChain::start(leaf("one", 1))
            .then("two", |v| async move { Ok(v * 2) })
            .unwrap()
            .then("four", |v| async move { Ok(v * 2) })
            .unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.last_task_id(), "four");
        assert!(chain.last_task().dependencies().contains("two"));

        let plan = chain.into_plan().unwrap();
        assert_eq!(plan.final_task_id(), "four");
    }

    #[test]
    fn test_chain_rejects_duplicate_id() {
        let err = TaskChain::start(leaf("a", 1))
            .then("a", |v| async move { Ok(v) })
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::DUPLICATE));
    }

    #[tokio::test]
    async fn test_then_traced_without_values_fails() {
        let chain = TaskChain::start(traced_task("empty", || async { Ok(TracedResult::<i32>::empty()) }).shared())
            .then_traced("next", |v| async move { Ok(TracedResult::output(v)) })
            .unwrap();

        let mut results = HashMap::new();
        results.insert("empty".to_string(), TracedResult::<i32>::empty());
        let result = chain
            .last_task()
            .execute(TaskInputs::new("next", results), Arc::new(NoOpMonitor))
            .await
            .unwrap();

        assert!(result.is_failure());
        assert_eq!(result.error_message(), Some("Task 'empty' produced no values"));
    }

    #[tokio::test]
    async fn test_then_on_list_sees_all_values() {
        let chain = TaskChain::start(traced_task("many", || async { Ok(TracedResult::outputs(vec![1, 2, 3])) }).shared())
            .then_on_list("sum", |values: Vec<i32>| async move {
                Ok(TracedResult::output(values.iter().sum()))
            })
            .unwrap();

        let mut results = HashMap::new();
        results.insert("many".to_string(), TracedResult::outputs(vec![1, 2, 3]));
        let result = chain
            .last_task()
            .execute(TaskInputs::new("sum", results), Arc::new(NoOpMonitor))
            .await
            .unwrap();

        assert_eq!(result.first_value(), Some(&6));
    }

    #[test]
    fn test_then_task_requires_tail_dependency() {
        let chain = TaskChain::start(leaf("a", 1));
        let unrelated = leaf("b", 2);
        let err = chain.then_task(unrelated).unwrap_err();
        assert_eq!(err.code(), Some(codes::MISSING_DEP));

        let chain = TaskChain::start(leaf("a", 1));
        let follower = dependent_task("b", ["a"], |_inputs: TaskInputs<i32>| async { Ok(TracedResult::output(0)) })
            .with_description("described follower")
            .shared();
        let chain = chain.then_task(follower).unwrap();
        assert_eq!(chain.last_task().description(), Some("described follower"));
    }

    #[test]
    fn test_from_tasks() {
        let chain = TaskChain::from_tasks(vec![leaf("a", 1), leaf("b", 2)]).unwrap();
        assert_eq!(chain.last_task_id(), "b");

        let err = TaskChain::<i32>::from_tasks(Vec::new()).unwrap_err();
        assert_eq!(err.code(), Some(codes::EMPTY));
    }

    #[test]
    fn test_aggregate_structure() {
        let chain = aggregate(vec![leaf("x", 1), leaf("y", 2), leaf("z", 3)]).unwrap();

        assert_eq!(chain.len(), 4);
        assert_eq!(chain.last_task_id(), DEFAULT_AGGREGATE_ID);
        assert_eq!(chain.last_task().dependencies().len(), 3);

        let plan = chain.build_plan().unwrap();
        assert_eq!(plan.final_task_id(), DEFAULT_AGGREGATE_ID);
    }

    #[test]
    fn test_aggregate_rejects_duplicates() {
        let err = aggregate(vec![leaf("x", 1), leaf("x", 2)]).unwrap_err();
        assert_eq!(err.code(), Some(codes::DUPLICATE));

        let err = aggregate_with_id("x", vec![leaf("x", 1)]).unwrap_err();
        assert_eq!(err.code(), Some(codes::DUPLICATE));
    }

    #[test]
    fn test_aggregate_requires_independent_inputs() {
        let dependent = dependent_task("y", ["x"], |_inputs: TaskInputs<i32>| async { Ok(TracedResult::output(0)) });
        let err = aggregate(vec![leaf("x", 1), dependent.shared()]).unwrap_err();
        assert_eq!(err.code(), Some(codes::NOT_INDEPENDENT));
    }

    #[tokio::test]
    async fn test_aggregate_orders_by_input_list() {
        let chain = aggregate_with_id("batch", vec![leaf("b", 2), leaf("a", 1)]).unwrap();

        let mut results = HashMap::new();
        results.insert("a".to_string(), TracedResult::output(1));
        results.insert("b".to_string(), TracedResult::output(2));
        let result = chain
            .last_task()
            .execute(TaskInputs::new("batch", results), Arc::new(NoOpMonitor))
            .await
            .unwrap();

        assert_eq!(result.values(), &[2, 1]);
    }

    #[tokio::test]
    async fn test_aggregate_keeps_every_value() {
        let many = traced_task("many", || async { Ok(TracedResult::outputs(vec![10, 11])) }).shared();
        let none = traced_task("none", || async { Ok(TracedResult::empty()) }).shared();
        let chain = aggregate(vec![many, none, leaf("one", 12)]).unwrap();

        let mut results = HashMap::new();
        results.insert("many".to_string(), TracedResult::outputs(vec![10, 11]));
        results.insert("none".to_string(), TracedResult::empty());
        results.insert("one".to_string(), TracedResult::output(12));
        let result = chain
            .last_task()
            .execute(TaskInputs::new(DEFAULT_AGGREGATE_ID, results), Arc::new(NoOpMonitor))
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.values(), &[10, 11, 12]);
    }
}
