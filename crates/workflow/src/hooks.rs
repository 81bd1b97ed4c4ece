//! Execution hooks for observability.
//!
//! Hooks observe engine events without touching the computation. The engine
//! calls them synchronously, in order, on the calling thread.
//!
//! ## Events
//!
//! - `on_execution_start`: sequence validated, before anything is composed
//! - `on_unverified_path`: the path contains tasks without a passing
//!   non-expansiveness check, so the bound may not hold
//! - `on_step`: one implementation step of the trace was pushed forward
//! - `on_execution_end`: result assembled
//! - `on_error`: the call is about to return an error
//!
//! ## Example
//!
//! ```rust
//! use compositional_workflow::{ExecutionHook, ExecutionSummary};
//!
//! struct Alarm;
//!
//! impl ExecutionHook for Alarm {
//!     fn on_execution_end(&self, summary: &ExecutionSummary) {
//!         if !summary.bound_holds(1e-9) {
//!             eprintln!("bound exceeded: {summary:?}");
//!         }
//!     }
//! }
//! ```

use crate::error::WorkflowError;
use crate::result::ExecutionSummary;

// ============================================================================
// Execution Hook Trait
// ============================================================================

/// Trait for observing engine events.
///
/// All methods have default no-op implementations, so you only need to
/// implement the events you care about.
pub trait ExecutionHook: Send + Sync {
    /// Called once the sequence is known to reference existing tasks.
    fn on_execution_start(&self, _sequence: &[String]) {}

    /// Called with the ids of tasks whose morphisms were not both certified.
    fn on_unverified_path(&self, _uncertified: &[String]) {}

    /// Called after each trace step.
    ///
    /// # Arguments
    /// * `task_id` - Task that just ran
    /// * `support_size` - Number of states in the running distribution
    fn on_step(&self, _task_id: &str, _support_size: usize) {}

    /// Called when a result is ready.
    fn on_execution_end(&self, _summary: &ExecutionSummary) {}

    /// Called before an error is returned to the caller.
    fn on_error(&self, _error: &WorkflowError) {}
}

// ============================================================================
// Null Hook
// ============================================================================

/// A no-op hook for when no observation is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHook;

impl ExecutionHook for NullHook {}

// ============================================================================
// Logging Hook
// ============================================================================

/// Emits `tracing` events. The engine's default hook.
///
/// Steps are logged at `debug`, results at `info`, unverified paths and
/// exceeded bounds at `warn`, errors at `error`.
#[derive(Debug, Clone, Copy)]
pub struct LoggingHook {
    /// Tolerance used when reporting whether the bound held.
    pub bound_tolerance: f64,
}

impl LoggingHook {
    pub fn new() -> Self {
        Self {
            bound_tolerance: 1e-9,
        }
    }

    pub fn with_bound_tolerance(tolerance: f64) -> Self {
        Self {
            bound_tolerance: tolerance,
        }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionHook for LoggingHook {
    fn on_execution_start(&self, sequence: &[String]) {
        tracing::debug!(path_length = sequence.len(), path = ?sequence, "Executing task path");
    }

    fn on_unverified_path(&self, uncertified: &[String]) {
        tracing::warn!(
            tasks = ?uncertified,
            "Path includes morphisms not verified non-expansive; the guaranteed bound may not hold"
        );
    }

    fn on_step(&self, task_id: &str, support_size: usize) {
        tracing::debug!(task = %task_id, support_size, "Step complete");
    }

    fn on_execution_end(&self, summary: &ExecutionSummary) {
        if summary.bound_holds(self.bound_tolerance) {
            tracing::info!(
                error = summary.actual_error,
                bound = summary.guaranteed_bound,
                certified = summary.certified,
                "Execution finished within bound"
            );
        } else {
            tracing::warn!(
                error = summary.actual_error,
                bound = summary.guaranteed_bound,
                certified = summary.certified,
                "Measured error exceeds guaranteed bound"
            );
        }
    }

    fn on_error(&self, error: &WorkflowError) {
        tracing::error!(%error, "Execution aborted");
    }
}

// ============================================================================
// Composite Hook
// ============================================================================

/// A hook that delegates to multiple inner hooks, in insertion order.
pub struct CompositeHook {
    hooks: Vec<Box<dyn ExecutionHook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook to the composite.
    pub fn with<H: ExecutionHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Default for CompositeHook {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionHook for CompositeHook {
    fn on_execution_start(&self, sequence: &[String]) {
        for hook in &self.hooks {
            hook.on_execution_start(sequence);
        }
    }

    fn on_unverified_path(&self, uncertified: &[String]) {
        for hook in &self.hooks {
            hook.on_unverified_path(uncertified);
        }
    }

    fn on_step(&self, task_id: &str, support_size: usize) {
        for hook in &self.hooks {
            hook.on_step(task_id, support_size);
        }
    }

    fn on_execution_end(&self, summary: &ExecutionSummary) {
        for hook in &self.hooks {
            hook.on_execution_end(summary);
        }
    }

    fn on_error(&self, error: &WorkflowError) {
        for hook in &self.hooks {
            hook.on_error(error);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHook {
        steps: Arc<AtomicUsize>,
        warnings: Arc<AtomicUsize>,
    }

    impl CountingHook {
        fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let steps = Arc::new(AtomicUsize::new(0));
            let warnings = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    steps: Arc::clone(&steps),
                    warnings: Arc::clone(&warnings),
                },
                steps,
                warnings,
            )
        }
    }

    impl ExecutionHook for CountingHook {
        fn on_step(&self, _task_id: &str, _support_size: usize) {
            self.steps.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unverified_path(&self, _uncertified: &[String]) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn summary(actual_error: f64) -> ExecutionSummary {
        ExecutionSummary {
            success: true,
            path_length: 1,
            actual_error,
            guaranteed_bound: 0.1,
            certified: true,
        }
    }

    #[test]
    fn test_null_hook() {
        let hook = NullHook;
        hook.on_execution_start(&["a".to_string()]);
        hook.on_execution_end(&summary(0.0));
        hook.on_error(&WorkflowError::UnknownTask { id: "a".into() });
    }

    #[test]
    fn test_logging_hook_without_subscriber() {
        let hook = LoggingHook::default();
        hook.on_unverified_path(&["a".to_string()]);
        hook.on_step("a", 3);
        hook.on_execution_end(&summary(0.05));
        hook.on_execution_end(&summary(0.5));
    }

    #[test]
    fn test_counting_hook() {
        let (hook, steps, warnings) = CountingHook::new();
        hook.on_step("a", 1);
        hook.on_step("b", 2);
        hook.on_unverified_path(&[]);

        assert_eq!(steps.load(Ordering::SeqCst), 2);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_composite_hook() {
        let (hook1, steps1, _) = CountingHook::new();
        let (hook2, steps2, _) = CountingHook::new();

        let composite = CompositeHook::new().with(hook1).with(hook2).with(NullHook);
        assert_eq!(composite.len(), 3);

        composite.on_step("a", 1);

        assert_eq!(steps1.load(Ordering::SeqCst), 1);
        assert_eq!(steps2.load(Ordering::SeqCst), 1);
    }
}
