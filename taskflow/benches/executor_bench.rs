//! Benchmarks for plan execution.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use taskflow::core::TracedResult;
use taskflow::monitor::NoOpMonitor;
use taskflow::plan::{aggregate, Plan, PlanExecutor, RetryPolicy, TaskChain};
use taskflow::tasks::task;

fn fan_in_plan(width: usize) -> Plan<usize> {
    let inputs = (0..width)
        .map(|i| task(format!("input-{i}"), move || async move { Ok(i) }).shared())
        .collect();
    aggregate(inputs)
        .and_then(|chain| {
            chain.then_on_list("sum", |values| async move {
                Ok(TracedResult::output(values.iter().sum()))
            })
        })
        .and_then(TaskChain::into_plan)
        .unwrap()
}

fn chain_plan(length: usize) -> Plan<usize> {
    let mut chain = TaskChain::start(task("step-0", || async { Ok(0) }).shared());
    for i in 1..length {
        chain = chain
            .then(format!("step-{i}"), |n| async move { Ok(n + 1) })
            .unwrap();
    }
    chain.into_plan().unwrap()
}

fn executor_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let executor = PlanExecutor::with_retry_policy(RetryPolicy::no_retry());

    let mut group = c.benchmark_group("fan_in");
    for width in [10, 100] {
        let plan = fan_in_plan(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &plan, |b, plan| {
            b.iter(|| {
                let result = runtime.block_on(executor.execute(plan, Arc::new(NoOpMonitor)));
                black_box(result.final_values().len())
            });
        });
    }
    group.finish();

    let mut group = c.benchmark_group("chain");
    for length in [10, 50] {
        let plan = chain_plan(length);
        group.bench_with_input(BenchmarkId::from_parameter(length), &plan, |b, plan| {
            b.iter(|| {
                let result = runtime.block_on(executor.execute(plan, Arc::new(NoOpMonitor)));
                black_box(result.is_success())
            });
        });
    }
    group.finish();

    c.bench_function("plan_validation", |b| {
        b.iter(|| black_box(fan_in_plan(100).len()));
    });
}

criterion_group!(benches, executor_benchmark);
criterion_main!(benches);
