//! Noisy Pipeline: compositional error bounds on a three-stage workflow
//!
//! Run with: RUST_LOG=compositional_workflow=debug cargo run -p compositional-workflow --example noisy_pipeline
//!
//! This example demonstrates:
//! - Building a task graph with certified (non-expansive) tasks
//! - Executing a path through implementation and specification layers
//! - Comparing the measured Wasserstein error with Σεᵢ + (n−1)·δ_F
//! - Auditing each task's declared ε against its measured drift

use compositional_kleisli::{deterministic, from_fn, Absolute, Distribution};
use compositional_workflow::{
    Engine, EngineConfig, JudgedValidator, Judgment, NewTask, PassThroughValidator, TaskDag,
    WorkflowError,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), WorkflowError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Noisy Pipeline ===\n");

    // -------------------------------------------------------------------------
    // 1. Build the graph
    // -------------------------------------------------------------------------
    println!("1. Task graph");
    println!("-------------");

    let samples: Vec<i64> = (0..8).collect();
    let mut dag = TaskDag::with_metric(Absolute);

    dag.add_task(
        NewTask::new(
            "fetch",
            from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)])),
            deterministic(|&s: &i64| s + 1),
            PassThroughValidator::new(0.1),
        )
        .describe("occasionally fetches one record too many")
        .verify_both()
        .samples(samples.clone()),
    )?;

    dag.add_task(
        NewTask::new(
            "transform",
            from_fn(|&s: &i64| Distribution::from_raw([(s + 3, 0.85), (s + 4, 0.15)])),
            deterministic(|&s: &i64| s + 3),
            PassThroughValidator::new(0.15),
        )
        .verify_both()
        .samples(samples.clone()),
    )?;

    dag.add_task(
        NewTask::new(
            "publish",
            from_fn(|&s: &i64| Distribution::from_raw([(s, 0.95), (s - 1, 0.05)])),
            deterministic(|&s: &i64| s),
            JudgedValidator::new(Judgment::new(0.05, 0.01, "rare rollback")),
        )
        .verify_both()
        .samples(samples.clone()),
    )?;

    dag.add_dependency("fetch", "transform")?;
    dag.add_dependency("transform", "publish")?;

    println!("{dag}");
    println!("Order: {:?}", dag.topological_order());

    match dag.add_dependency("publish", "fetch") {
        Err(e) => println!("Rejected: {e}"),
        Ok(()) => println!("Unexpectedly accepted a cycle"),
    }
    println!();

    // -------------------------------------------------------------------------
    // 2. Execute
    // -------------------------------------------------------------------------
    println!("2. Execution");
    println!("------------");

    for delta_f in [0.0, 0.02] {
        let config = EngineConfig::default().with_delta_f(delta_f);
        let engine = Engine::with_config(&dag, Absolute, config)?;
        let result = engine.execute_all(&10, true)?;

        println!("δ_F = {delta_f}: {result}");
        println!("  certified: {}", result.certified);
        println!("  local ε:   {:?}", result.local_errors);
        for step in &result.trace {
            let mut support: Vec<_> = step.distribution.iter().collect();
            support.sort_by_key(|(s, _)| **s);
            println!("  after {:<10} {:?}", step.task_id, support);
        }
    }
    println!();

    // -------------------------------------------------------------------------
    // 3. Audit local bounds
    // -------------------------------------------------------------------------
    println!("3. Local bound audit");
    println!("--------------------");

    let engine = Engine::new(&dag, Absolute, 0.0)?;
    for audit in engine.audit_local_bounds(&dag.topological_order()[..], &samples)? {
        let verdict = if audit.exceeded { "EXCEEDED" } else { "ok" };
        println!(
            "  {:<10} ε = {:.3}, measured = {:.3}  {}",
            audit.task_id, audit.epsilon, audit.measured, verdict
        );
    }

    Ok(())
}
