//! Validated task graphs.

use crate::core::TaskValue;
use crate::errors::{CycleDetectedError, PlanValidationError};
use crate::tasks::SharedTask;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A validated set of tasks ready for execution.
///
/// Construction rejects empty plans, duplicate ids, self dependencies,
/// unknown dependencies, and cycles, so an executor never has to detect a
/// stuck graph at run time.
pub struct Plan<T> {
    tasks: Vec<SharedTask<T>>,
    index: HashMap<String, usize>,
    final_task: String,
    execution_order: Vec<String>,
}

impl<T: TaskValue> Plan<T> {
    /// Validates `tasks` and builds a plan.
    ///
    /// The final task defaults to the last task in the list.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanValidationError`] describing the first problem found.
    pub fn new(tasks: Vec<SharedTask<T>>) -> Result<Self, PlanValidationError> {
        let Some(last) = tasks.last() else {
            return Err(PlanValidationError::empty());
        };
        let final_task = last.id().to_string();

        let mut index = HashMap::with_capacity(tasks.len());
        for (position, task) in tasks.iter().enumerate() {
            if index.insert(task.id().to_string(), position).is_some() {
                return Err(PlanValidationError::duplicate(task.id()));
            }
        }

        for task in &tasks {
            for dep in task.dependencies() {
                if dep == task.id() {
                    return Err(PlanValidationError::self_dependency(task.id()));
                }
                if !index.contains_key(dep) {
                    return Err(PlanValidationError::missing_dependency(task.id(), dep));
                }
            }
        }

        let mut plan = Self {
            tasks,
            index,
            final_task,
            execution_order: Vec::new(),
        };
        plan.detect_cycles()?;
        plan.execution_order = plan.topological_sort();
        Ok(plan)
    }

    /// Designates the task whose result is reported as the plan's result.
    ///
    /// # Errors
    ///
    /// Returns an error if no task has the given id.
    pub fn with_final_task(mut self, task_id: impl Into<String>) -> Result<Self, PlanValidationError> {
        let task_id = task_id.into();
        if !self.index.contains_key(&task_id) {
            return Err(PlanValidationError::unknown_final(&task_id));
        }
        self.final_task = task_id;
        Ok(self)
    }

    /// Returns the tasks in plan order.
    #[must_use]
    pub fn tasks(&self) -> &[SharedTask<T>] {
        &self.tasks
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn task(&self, task_id: &str) -> Option<&SharedTask<T>> {
        self.index.get(task_id).map(|&position| &self.tasks[position])
    }

    /// Returns true if the plan contains a task with this id.
    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.index.contains_key(task_id)
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false; empty plans are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns the id of the designated final task.
    #[must_use]
    pub fn final_task_id(&self) -> &str {
        &self.final_task
    }

    /// Returns the task ids in plan order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|task| task.id())
    }

    /// Returns a topological order of the task ids.
    ///
    /// Ties are broken by plan order, so the result is deterministic.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for task in &self.tasks {
            if !visited.contains(task.id()) {
                if let Some(cycle) = self.dfs_cycle(task.id(), &mut visited, &mut rec_stack, &mut path) {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }

        Ok(())
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(task) = self.task(node) {
            for dep in task.dependencies() {
                if !visited.contains(dep) {
                    if let Some(cycle) = self.dfs_cycle(dep, visited, rec_stack, path) {
                        return Some(cycle);
                    }
                } else if rec_stack.contains(dep) {
                    let start = path.iter().position(|n| n == dep).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
        None
    }

    fn topological_sort(&self) -> Vec<String> {
        fn visit<T: TaskValue>(
            node: &str,
            plan: &Plan<T>,
            visited: &mut HashSet<String>,
            result: &mut Vec<String>,
        ) {
            if !visited.insert(node.to_string()) {
                return;
            }
            if let Some(task) = plan.task(node) {
                // Dependencies in plan order, not set order.
                let mut deps: Vec<&String> = task.dependencies().iter().collect();
                deps.sort_by_key(|dep| plan.index.get(*dep).copied().unwrap_or(usize::MAX));
                for dep in deps {
                    visit(dep, plan, visited, result);
                }
            }
            result.push(node.to_string());
        }

        let mut result = Vec::with_capacity(self.tasks.len());
        let mut visited = HashSet::new();
        for task in &self.tasks {
            visit(task.id(), self, &mut visited, &mut result);
        }
        result
    }
}

impl<T> Clone for Plan<T> {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            index: self.index.clone(),
            final_task: self.final_task.clone(),
            execution_order: self.execution_order.clone(),
        }
    }
}

impl<T> fmt::Debug for Plan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("tasks", &self.execution_order)
            .field("final_task", &self.final_task)
            .finish()
    }
}

/// Produces the list of tasks making up a plan.
pub trait Planner<T: TaskValue> {
    /// Returns the tasks, in plan order.
    fn plan(&self) -> Vec<SharedTask<T>>;

    /// Validates the tasks into a [`Plan`].
    ///
    /// # Errors
    ///
    /// Returns an error if the tasks do not form a valid plan.
    fn build_plan(&self) -> Result<Plan<T>, PlanValidationError> {
        Plan::new(self.plan())
    }
}

/// A planner over a fixed list of tasks.
pub struct StaticPlanner<T> {
    tasks: Vec<SharedTask<T>>,
}

impl<T: TaskValue> StaticPlanner<T> {
    /// Creates a planner returning `tasks`.
    #[must_use]
    pub fn new(tasks: Vec<SharedTask<T>>) -> Self {
        Self { tasks }
    }
}

impl<T: TaskValue> Planner<T> for StaticPlanner<T> {
    fn plan(&self) -> Vec<SharedTask<T>> {
        self.tasks.clone()
    }
}

impl<T> fmt::Debug for StaticPlanner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|task| task.id().to_string()))
            .finish()
    }
}
