//! Execution engine.
//!
//! Runs a task path through both layers and measures how far they drift:
//!
//! ```text
//! W₁(F(path)(x), G(path)(x)) ≤ Σεᵢ + (n−1)·δ_F
//! ```
//!
//! where εᵢ comes from each task's validator and δ_F is the composition
//! discrepancy supplied by the caller. The right-hand side is only a theorem
//! when every morphism on the path is non-expansive; otherwise the engine
//! still reports it but raises `on_unverified_path` first.
//!
//! Validators are checks, not workers: the engine reads their ε and never
//! routes a state through `validate`.

use std::sync::Arc;

use compositional_kleisli::{
    compose_all, morphism_distance, wasserstein1, Distribution, KleisliMorphism, State,
    StateMetric,
};

use crate::config::EngineConfig;
use crate::error::WorkflowError;
use crate::graph::{SharedMetric, TaskDag};
use crate::hooks::{ExecutionHook, LoggingHook};
use crate::result::{ExecutionResult, LocalBoundAudit, TraceStep};
use crate::task::Task;

/// Executes paths through a borrowed [`TaskDag`].
///
/// Each call is a pure function of its arguments and the graph's current
/// contents; the engine holds no per-call state.
pub struct Engine<'a, S> {
    dag: &'a TaskDag<S>,
    metric: SharedMetric<S>,
    config: EngineConfig,
    hook: Box<dyn ExecutionHook>,
}

impl<'a, S: State> Engine<'a, S> {
    /// Engine with composition discrepancy `delta_f` and otherwise default
    /// configuration.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::InvalidConfig`] if `delta_f` is negative or non-finite.
    pub fn new<M>(dag: &'a TaskDag<S>, metric: M, delta_f: f64) -> Result<Self, WorkflowError>
    where
        M: StateMetric<S> + 'static,
    {
        Self::with_config(dag, metric, EngineConfig::default().with_delta_f(delta_f))
    }

    pub fn with_config<M>(
        dag: &'a TaskDag<S>,
        metric: M,
        config: EngineConfig,
    ) -> Result<Self, WorkflowError>
    where
        M: StateMetric<S> + 'static,
    {
        Self::with_shared_metric(dag, Arc::new(metric), config)
    }

    /// Use an already-shared metric, e.g. the one the graph verified with.
    pub fn with_shared_metric(
        dag: &'a TaskDag<S>,
        metric: SharedMetric<S>,
        config: EngineConfig,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;
        Ok(Self {
            dag,
            metric,
            hook: Box::new(LoggingHook::with_bound_tolerance(config.bound_tolerance)),
            config,
        })
    }

    /// Replace the default [`LoggingHook`].
    pub fn with_hook<H: ExecutionHook + 'static>(mut self, hook: H) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn delta_f(&self) -> f64 {
        self.config.delta_f
    }

    pub fn dag(&self) -> &'a TaskDag<S> {
        self.dag
    }

    /// Run `sequence` from `initial` through both layers.
    ///
    /// The sequence is taken as given; it is not checked against the graph's
    /// dependency order. When `warn_no_verification` is set and some task on
    /// the path is not certified, the hook's `on_unverified_path` fires before
    /// anything is composed. Execution proceeds either way.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::UnknownTask`] for the first id not in the graph
    /// - [`WorkflowError::InvalidEpsilon`] if a validator reports a negative
    ///   or non-finite ε
    ///
    /// Either aborts the call; there is no partial result.
    pub fn execute<T: AsRef<str>>(
        &self,
        sequence: &[T],
        initial: &S,
        warn_no_verification: bool,
    ) -> Result<ExecutionResult<S>, WorkflowError> {
        self.run_path(sequence, initial, warn_no_verification)
            .inspect_err(|e| self.hook.on_error(e))
    }

    /// [`execute`](Self::execute) with the configured warning setting.
    pub fn run<T: AsRef<str>>(
        &self,
        sequence: &[T],
        initial: &S,
    ) -> Result<ExecutionResult<S>, WorkflowError> {
        self.execute(sequence, initial, self.config.warn_no_verification)
    }

    /// Run every task in [`TaskDag::topological_order`] as one linear path.
    pub fn execute_all(
        &self,
        initial: &S,
        warn_no_verification: bool,
    ) -> Result<ExecutionResult<S>, WorkflowError> {
        let order = self.dag.topological_order();
        self.execute(order.as_slice(), initial, warn_no_verification)
    }

    /// Measure each task's actual drift `max_a W₁(F(a), G(a))` over `samples`
    /// and set it next to the ε its validator declares.
    ///
    /// An empty sample measures 0 for every task.
    pub fn audit_local_bounds<T: AsRef<str>>(
        &self,
        sequence: &[T],
        samples: &[S],
    ) -> Result<Vec<LocalBoundAudit>, WorkflowError> {
        let tasks = self.resolve(sequence)?;
        Ok(tasks
            .into_iter()
            .map(|task| {
                let epsilon = task.validator().epsilon();
                let measured = morphism_distance(
                    task.implementation().as_ref(),
                    task.specification().as_ref(),
                    samples,
                    self.metric.as_ref(),
                );
                LocalBoundAudit {
                    task_id: task.id().to_string(),
                    epsilon,
                    measured,
                    exceeded: measured > epsilon + self.config.bound_tolerance,
                }
            })
            .collect())
    }

    fn run_path<T: AsRef<str>>(
        &self,
        sequence: &[T],
        initial: &S,
        warn_no_verification: bool,
    ) -> Result<ExecutionResult<S>, WorkflowError> {
        let tasks = self.resolve(sequence)?;
        let ids: Vec<String> = tasks.iter().map(|t| t.id().to_string()).collect();
        self.hook.on_execution_start(&ids);

        if tasks.is_empty() {
            let result = self.identity_result(initial);
            self.hook.on_execution_end(&result.summary());
            return Ok(result);
        }

        let uncertified: Vec<String> = tasks
            .iter()
            .filter(|t| !t.is_certified())
            .map(|t| t.id().to_string())
            .collect();
        if warn_no_verification && !uncertified.is_empty() {
            self.hook.on_unverified_path(&uncertified);
        }

        let local_errors = tasks
            .iter()
            .map(|task| {
                let epsilon = task.validator().epsilon();
                if epsilon.is_finite() && epsilon >= 0.0 {
                    Ok(epsilon)
                } else {
                    Err(WorkflowError::InvalidEpsilon {
                        id: task.id().to_string(),
                        epsilon,
                    })
                }
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let n = tasks.len();
        let guaranteed_bound =
            local_errors.iter().sum::<f64>() + (n - 1) as f64 * self.config.delta_f;

        let spec_path = compose_all(tasks.iter().map(|t| Arc::clone(t.specification())));
        let spec_distribution = spec_path.apply(initial);

        let impl_path = compose_all(tasks.iter().map(|t| Arc::clone(t.implementation())));
        let final_distribution = impl_path.apply(initial);

        let mut trace = Vec::with_capacity(n);
        let mut running = Distribution::point(initial.clone());
        for task in &tasks {
            running = running.bind(task.implementation().as_ref());
            self.hook.on_step(task.id(), running.len());
            trace.push(TraceStep {
                task_id: task.id().to_string(),
                distribution: running.clone(),
            });
        }

        let actual_error =
            wasserstein1(&final_distribution, &spec_distribution, self.metric.as_ref());

        let result = ExecutionResult {
            success: true,
            final_distribution,
            spec_distribution,
            actual_error,
            guaranteed_bound,
            path_length: n,
            composition_discrepancy: self.config.delta_f,
            local_errors,
            failed_at: None,
            certified: uncertified.is_empty(),
            trace,
        };
        self.hook.on_execution_end(&result.summary());
        Ok(result)
    }

    /// Empty path: both layers are the identity.
    fn identity_result(&self, initial: &S) -> ExecutionResult<S> {
        ExecutionResult {
            success: true,
            final_distribution: Distribution::point(initial.clone()),
            spec_distribution: Distribution::point(initial.clone()),
            actual_error: 0.0,
            guaranteed_bound: 0.0,
            path_length: 0,
            composition_discrepancy: self.config.delta_f,
            local_errors: Vec::new(),
            failed_at: None,
            certified: true,
            trace: Vec::new(),
        }
    }

    fn resolve<T: AsRef<str>>(&self, sequence: &[T]) -> Result<Vec<&'a Task<S>>, WorkflowError> {
        sequence.iter().map(|id| self.dag.get(id.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NullHook;
    use crate::task::NewTask;
    use crate::validator::{PassThroughValidator, Validator};
    use compositional_kleisli::{deterministic, from_fn, Absolute, Identity};

    fn noisy_dag() -> TaskDag<i64> {
        let mut dag = TaskDag::with_metric(Absolute);
        dag.add_task(NewTask::new(
            "a",
            from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)])),
            deterministic(|&s: &i64| s + 1),
            PassThroughValidator::new(0.1),
        ))
        .unwrap();
        dag.add_task(NewTask::new(
            "b",
            from_fn(|&s: &i64| Distribution::from_raw([(s + 3, 0.85), (s + 4, 0.15)])),
            deterministic(|&s: &i64| s + 3),
            PassThroughValidator::new(0.15),
        ))
        .unwrap();
        dag.add_dependency("a", "b").unwrap();
        dag
    }

    struct Broken;

    impl Validator<i64> for Broken {
        fn validate(&self, state: &i64) -> Distribution<i64> {
            Distribution::point(*state)
        }

        fn epsilon(&self) -> f64 {
            -0.5
        }
    }

    #[test]
    fn test_empty_sequence_is_identity() {
        let dag = noisy_dag();
        let engine = Engine::new(&dag, Absolute, 0.3).unwrap().with_hook(NullHook);
        let result = engine.execute::<&str>(&[], &5, true).unwrap();

        assert!(result.success);
        assert_eq!(result.final_distribution, Distribution::point(5));
        assert_eq!(result.spec_distribution, Distribution::point(5));
        assert_eq!(result.actual_error, 0.0);
        assert_eq!(result.guaranteed_bound, 0.0);
        assert_eq!(result.path_length, 0);
        assert!(result.trace.is_empty());
    }

    #[test]
    fn test_bound_adds_delta_per_junction() {
        let dag = noisy_dag();
        let engine = Engine::new(&dag, Absolute, 0.05).unwrap().with_hook(NullHook);
        let result = engine.execute(&["a", "b"], &0, false).unwrap();
        assert!((result.guaranteed_bound - 0.30).abs() < 1e-12);
        assert_eq!(result.local_errors, vec![0.1, 0.15]);
        assert_eq!(result.composition_discrepancy, 0.05);
    }

    #[test]
    fn test_unknown_task_aborts() {
        let dag = noisy_dag();
        let engine = Engine::new(&dag, Absolute, 0.0).unwrap().with_hook(NullHook);
        assert_eq!(
            engine.execute(&["a", "ghost"], &0, true).unwrap_err(),
            WorkflowError::UnknownTask { id: "ghost".into() }
        );
    }

    #[test]
    fn test_negative_epsilon_aborts() {
        let mut dag = noisy_dag();
        dag.add_task(NewTask::new("bad", Identity, Identity, Broken))
            .unwrap();
        let engine = Engine::new(&dag, Absolute, 0.0).unwrap().with_hook(NullHook);
        assert!(matches!(
            engine.execute(&["a", "bad"], &0, false),
            Err(WorkflowError::InvalidEpsilon { ref id, .. }) if id == "bad"
        ));
    }

    #[test]
    fn test_invalid_delta_rejected() {
        let dag = noisy_dag();
        assert!(matches!(
            Engine::new(&dag, Absolute, -1.0),
            Err(WorkflowError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_trace_matches_composition() {
        let dag = noisy_dag();
        let engine = Engine::new(&dag, Absolute, 0.0).unwrap().with_hook(NullHook);
        let result = engine.execute(&["a", "b"], &5, false).unwrap();

        assert_eq!(result.trace.len(), 2);
        assert_eq!(result.trace[0].task_id, "a");
        assert!((result.trace[0].distribution.prob(&6) - 0.9).abs() < 1e-12);
        let last = &result.trace[1].distribution;
        assert!(last.approx_eq(&result.final_distribution, 1e-12));
    }

    #[test]
    fn test_execute_all_follows_topological_order() {
        let dag = noisy_dag();
        let engine = Engine::new(&dag, Absolute, 0.0).unwrap().with_hook(NullHook);
        let result = engine.execute_all(&0, false).unwrap();
        let ids: Vec<&str> = result.trace.iter().map(|s| s.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_audit_local_bounds() {
        let dag = noisy_dag();
        let engine = Engine::new(&dag, Absolute, 0.0).unwrap().with_hook(NullHook);
        let audit = engine.audit_local_bounds(&["a", "b"], &[0, 1, 2]).unwrap();

        assert_eq!(audit.len(), 2);
        assert!((audit[0].measured - 0.1).abs() < 1e-12);
        assert!(!audit[0].exceeded);
        assert!((audit[1].measured - 0.15).abs() < 1e-12);
        assert!(!audit[1].exceeded);

        let empty = engine.audit_local_bounds(&["a"], &[]).unwrap();
        assert_eq!(empty[0].measured, 0.0);
    }
}
