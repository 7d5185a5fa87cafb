//! End-to-end tests for plan execution.

use crate::core::{FailureKind, TaskStatus, TracedResult};
use crate::monitor::{CollectingMonitor, MonitorEventKind, NoOpMonitor, TeeMonitor};
use crate::plan::{aggregate, ExecutorConfig, Plan, PlanExecutor, Planner, StaticPlanner, TaskChain};
use crate::tasks::{dependent_task, task, MonitoredTask, SharedTask, TaskInputs};
use crate::testing::{
    assert_attempts, assert_completed_before, assert_failed, assert_failure_kind,
    assert_succeeded, assert_task_status, assert_values, fast_retry_policy, ConcurrencyGauge,
    CountingTask, FailingTask, FailureMode, FlakyTask, SlowTask, TestHarness, ValueTask,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn shared<K: crate::tasks::Task<String> + 'static>(task: K) -> SharedTask<String> {
    Arc::new(task)
}

/// A (no deps), B (dep A), C (dep A), D (deps B, C).
fn diamond(c: SharedTask<String>) -> (Vec<Arc<ValueTask<String>>>, Plan<String>) {
    let a = Arc::new(ValueTask::new("A", "a".to_string()));
    let b = Arc::new(ValueTask::new("B", "b".to_string()).depends_on(["A"]));
    let d = Arc::new(ValueTask::new("D", "d".to_string()).depends_on(["B", "C"]));
    let plan = Plan::new(vec![
        a.clone() as SharedTask<String>,
        b.clone(),
        c,
        d.clone(),
    ])
    .unwrap();
    (vec![a, b, d], plan)
}

#[tokio::test]
async fn test_every_task_runs_exactly_once() {
    let c = Arc::new(ValueTask::new("C", "c".to_string()).depends_on(["A"]));
    let (tasks, plan) = diamond(c.clone());

    let run = TestHarness::new().with_retries(3).run(&plan).await;

    assert!(run.result.is_success());
    for task in &tasks {
        assert_eq!(task.call_count(), 1);
    }
    assert_eq!(c.call_count(), 1);
    assert_eq!(run.result.results.len(), 4);
    assert!(run.result.blocked.is_empty());
    assert_eq!(run.result.final_task_id, "D");
}

#[tokio::test]
async fn test_dependency_ordering() {
    let c = shared(SlowTask::with_delay_ms("C", 20, "c".to_string()).depends_on(["A"]));
    let (tasks, plan) = diamond(c);

    let run = TestHarness::new().run(&plan).await;
    let monitor = &run.monitor;

    assert_completed_before(monitor, "A", "B");
    assert_completed_before(monitor, "A", "C");
    assert_completed_before(monitor, "B", "D");
    assert_completed_before(monitor, "C", "D");

    // D sees exactly its two dependencies.
    assert_eq!(tasks[2].seen_inputs(), vec![vec!["B".to_string(), "C".to_string()]]);
    assert_eq!(monitor.completed().last().map(String::as_str), Some("D"));
}

#[tokio::test]
async fn test_failure_propagation() {
    let c = Arc::new(FailingTask::new("C", "C is broken").depends_on(["A"]));
    let (tasks, plan) = diamond(c.clone());

    let run = TestHarness::new().with_retries(2).run(&plan).await;
    let result = &run.result;

    // D never runs and is absent from the result table.
    assert_eq!(tasks[2].call_count(), 0);
    assert!(result.get("D").is_none());
    assert_eq!(result.blocked, vec!["D".to_string()]);
    assert!(!run.monitor.started().contains(&"D".to_string()));

    assert_succeeded(result.get("A").unwrap());
    assert_succeeded(result.get("B").unwrap());
    assert_failed(result.get("C").unwrap());
    assert_eq!(result.completed(), vec!["A", "B"]);
    assert_eq!(result.failed(), vec!["C"]);
    assert_task_status(result, "D", TaskStatus::Blocked);

    // A non-retryable reported failure is accepted on the first attempt.
    assert_eq!(c.call_count(), 1);
    assert_attempts(result.get("C").unwrap(), 1);

    // The final task never ran, so the run reports it as blocked.
    assert!(!result.is_success());
    assert_failure_kind(&result.final_result, FailureKind::Blocked);
    assert!(result.final_result.error_message().unwrap_or_default().contains('C'));
    assert_eq!(run.monitor.failed(), vec!["C".to_string()]);
}

#[tokio::test]
async fn test_transitive_blocking() {
    let plan = Plan::new(vec![
        shared(FailingTask::with_mode("root", "down", FailureMode::Raised)),
        shared(ValueTask::new("mid", "m".to_string()).depends_on(["root"])),
        shared(ValueTask::new("leaf", "l".to_string()).depends_on(["mid"])),
        shared(ValueTask::new("side", "s".to_string())),
    ])
    .unwrap()
    .with_final_task("side")
    .unwrap();

    let run = TestHarness::new().run(&plan).await;

    assert!(run.result.is_success());
    assert_eq!(run.result.blocked, vec!["mid".to_string(), "leaf".to_string()]);
    assert_eq!(run.result.results.len(), 2);
    assert_failure_kind(run.result.get("root").unwrap(), FailureKind::Raised);
}

#[tokio::test]
async fn test_blocked_final_names_unmet_dependency() {
    let plan = Plan::new(vec![
        shared(FailingTask::with_mode("root", "down", FailureMode::Raised)),
        shared(ValueTask::new("mid", "m".to_string()).depends_on(["root"])),
        shared(ValueTask::new("leaf", "l".to_string()).depends_on(["mid"])),
    ])
    .unwrap();

    let run = TestHarness::new().run(&plan).await;

    assert_failure_kind(&run.result.final_result, FailureKind::Blocked);
    let message = run.result.final_result.error_message().unwrap();
    assert!(message.contains("unmet dependencies: mid"), "{message}");
    assert!(!message.contains("failed"), "{message}");
}

#[tokio::test]
async fn test_retry_until_success() {
    let flaky = Arc::new(FlakyTask::new("flaky", 2, "ok".to_string()));
    let plan = Plan::new(vec![flaky.clone() as SharedTask<String>]).unwrap();

    let run = TestHarness::new().with_retries(2).run(&plan).await;

    assert_succeeded(&run.result.final_result);
    assert_attempts(&run.result.final_result, 3);
    assert_eq!(flaky.call_count(), 3);
    assert!(run.result.final_result.exec.response_time_total_ms.unwrap_or_default()
        >= run.result.final_result.exec.response_time_ms.unwrap_or_default());
}

#[tokio::test]
async fn test_retry_exhausted() {
    let flaky = Arc::new(FlakyTask::new("flaky", 2, "ok".to_string()));
    let plan = Plan::new(vec![flaky.clone() as SharedTask<String>]).unwrap();

    let run = TestHarness::new().with_retries(1).run(&plan).await;

    assert_failed(&run.result.final_result);
    assert_attempts(&run.result.final_result, 2);
    assert_failure_kind(&run.result.final_result, FailureKind::Raised);
    assert_eq!(flaky.call_count(), 2);
    assert_eq!(run.monitor.failed(), vec!["flaky".to_string()]);
}

#[tokio::test]
async fn test_retryable_reported_failure_is_retried() {
    let failing = Arc::new(FailingTask::with_mode("busy", "try later", FailureMode::RetryableReported));
    let plan = Plan::new(vec![failing.clone() as SharedTask<String>]).unwrap();

    let run = TestHarness::new().with_retries(2).run(&plan).await;

    assert_eq!(failing.call_count(), 3);
    assert_attempts(&run.result.final_result, 3);
    assert_failure_kind(&run.result.final_result, FailureKind::Reported);
}

#[tokio::test]
async fn test_fan_in_preserves_declaration_order() {
    let chain = aggregate(vec![
        shared(SlowTask::with_delay_ms("x", 30, "x".to_string())),
        shared(SlowTask::with_delay_ms("y", 1, "y".to_string())),
        shared(SlowTask::with_delay_ms("z", 15, "z".to_string())),
    ])
    .unwrap();
    let plan = chain.build_plan().unwrap();

    let run = TestHarness::new().run(&plan).await;

    assert_values(&run.result.final_result, &["x", "y", "z"].map(String::from));
    // Completion order differs from declaration order.
    assert_eq!(run.monitor.completed(), ["y", "z", "x", "aggregate"].map(String::from).to_vec());
}

#[tokio::test]
async fn test_linear_chain_doubles() {
    let chain = TaskChain::start(task("step0", || async { Ok(1_i64) }).shared())
        .then("step1", |v| async move { Ok(v * 2) })
        .unwrap()
        .then("step2", |v| async move { Ok(v * 2) })
        .unwrap()
        .then("step3", |v| async move { Ok(v * 2) })
        .unwrap();
    let plan = chain.into_plan().unwrap();

    let run = TestHarness::new().run(&plan).await;

    assert_values(&run.result.final_result, &[8]);
    assert_values(run.result.get("step0").unwrap(), &[1]);
    assert_values(run.result.get("step1").unwrap(), &[2]);
    assert_values(run.result.get("step2").unwrap(), &[4]);
    assert_eq!(run.result.summary().completed, 4);
}

#[tokio::test]
async fn test_chain_after_fan_in_sees_full_list() {
    let chain = aggregate(vec![
        task("a", || async { Ok(3_u32) }).shared(),
        task("b", || async { Ok(4_u32) }).shared(),
    ])
    .unwrap()
    .then_on_list("total", |values: Vec<u32>| async move {
        Ok(TracedResult::output(values.iter().sum()))
    })
    .unwrap();

    let run = TestHarness::new().run(&chain.into_plan().unwrap()).await;
    assert_values(&run.result.final_result, &[7]);
}

#[tokio::test]
async fn test_attempt_timeout() {
    let plan = Plan::new(vec![shared(SlowTask::with_delay_ms("sleepy", 1_000, String::new()))]).unwrap();

    let run = TestHarness::new()
        .with_retries(1)
        .with_attempt_timeout_ms(10)
        .run(&plan)
        .await;

    assert_failure_kind(&run.result.final_result, FailureKind::TimedOut);
    assert_attempts(&run.result.final_result, 2);
}

#[tokio::test]
async fn test_panic_becomes_failure() {
    let plan = Plan::new(vec![
        shared(FailingTask::with_mode("boom", "exploded", FailureMode::Panic)),
        shared(ValueTask::new("calm", "fine".to_string())),
    ])
    .unwrap();

    let run = TestHarness::new().run(&plan).await;

    let boom = run.result.get("boom").unwrap();
    assert_failure_kind(boom, FailureKind::Panicked);
    assert_eq!(boom.error_info().and_then(|e| e.cause.as_deref()), Some("exploded"));
    assert_attempts(boom, 1);
    assert!(boom.exec.started_at.is_some());
    assert_succeeded(run.result.get("calm").unwrap());
}

#[tokio::test]
async fn test_panicking_task_is_retried() {
    let plan = Plan::new(vec![shared(FailingTask::with_mode("boom", "exploded", FailureMode::Panic))]).unwrap();

    let run = TestHarness::new().with_retries(2).run(&plan).await;

    let boom = &run.result.final_result;
    assert_failure_kind(boom, FailureKind::Panicked);
    assert_attempts(boom, 3);
    assert!(boom.exec.started_at.is_some());
    assert!(boom.exec.response_time_total_ms.is_some());
}

#[tokio::test]
async fn test_concurrency_limit() {
    let gauge = Arc::new(ConcurrencyGauge::new());
    let tasks: Vec<SharedTask<String>> = (0..6)
        .map(|i| shared(SlowTask::with_delay_ms(format!("t{i}"), 10, String::new()).with_gauge(gauge.clone())))
        .collect();
    let plan = Plan::new(tasks).unwrap();

    let run = TestHarness::new().with_max_concurrency(2).run(&plan).await;

    assert_eq!(run.result.summary().completed, 6);
    assert!(gauge.peak() <= 2);
}

#[tokio::test]
async fn test_wavefront_runs_concurrently() {
    let gauge = Arc::new(ConcurrencyGauge::new());
    let tasks: Vec<SharedTask<String>> = (0..4)
        .map(|i| shared(SlowTask::with_delay_ms(format!("t{i}"), 30, String::new()).with_gauge(gauge.clone())))
        .collect();
    let plan = Plan::new(tasks).unwrap();

    let run = TestHarness::new().run(&plan).await;

    assert!(run.result.is_success());
    assert!(gauge.peak() > 1);
}

#[tokio::test]
async fn test_counting_task_with_tee_monitor() {
    let reporter = dependent_task("report", Vec::<String>::new(), |inputs: TaskInputs<String>| async move {
        Ok(TracedResult::output(inputs.task_id().to_string()))
    });
    let counting = Arc::new(CountingTask::new(reporter.shared()));
    let plan = StaticPlanner::new(vec![counting.clone() as SharedTask<String>])
        .build_plan()
        .unwrap();

    let collecting = Arc::new(CollectingMonitor::new());
    let tee = TeeMonitor::new().with(collecting.clone()).with(Arc::new(NoOpMonitor));
    let result = PlanExecutor::new(ExecutorConfig::new().with_retry(fast_retry_policy(0)))
        .execute(&plan, Arc::new(tee))
        .await;

    assert_eq!(counting.call_count(), 1);
    assert_values(&result.final_result, &["report".to_string()]);
    let events = collecting.events_for("report");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, MonitorEventKind::Started);
}

#[tokio::test]
async fn test_monitored_task_callback() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let inner = task("source", || async { Ok("value".to_string()) }).shared();
    let monitored = MonitoredTask::new(inner, move |values: &[String]| sink.lock().extend_from_slice(values));
    let plan = Plan::new(vec![shared(monitored)]).unwrap();

    let run = TestHarness::new().run(&plan).await;

    assert!(run.result.is_success());
    assert_eq!(*seen.lock(), vec!["value".to_string()]);
}

#[tokio::test]
async fn test_run_metadata() {
    let plan = Plan::new(vec![shared(ValueTask::new("only", String::new()))]).unwrap();
    let executor = PlanExecutor::default();

    let first = executor.execute(&plan, Arc::new(NoOpMonitor)).await;
    let second = executor.execute(&plan, Arc::new(NoOpMonitor)).await;

    assert_ne!(first.run_id, second.run_id);
    assert!(first.duration_ms >= 0.0);
    assert!(first.get("only").and_then(|r| r.exec.started_at).is_some());
    tokio_test::assert_ok!(serde_json::to_string(&first));
}

#[tokio::test]
async fn test_independent_branches_all_complete() {
    let plan = Plan::new(vec![
        shared(SlowTask::new("slow", Duration::from_millis(20), String::new())),
        shared(ValueTask::new("fast", String::new())),
        shared(ValueTask::new("after_fast", String::new()).depends_on(["fast"])),
    ])
    .unwrap()
    .with_final_task("after_fast")
    .unwrap();

    let run = TestHarness::new().run(&plan).await;

    assert!(run.result.is_success());
    assert_eq!(run.result.summary().total, 3);
    assert_completed_before(&run.monitor, "fast", "after_fast");
    assert_task_status(&run.result, "slow", TaskStatus::Completed);
}
