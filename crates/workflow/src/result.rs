//! Execution reports.
//!
//! Everything here is plain data: produced once per call, owned by the
//! caller, serializable for whoever persists it.

use std::fmt;
use std::hash::Hash;

use compositional_kleisli::Distribution;
use serde::{Deserialize, Serialize};

// ============================================================================
// Trace
// ============================================================================

/// Implementation distribution right after one task ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize + Eq + Hash",
    deserialize = "S: Deserialize<'de> + Eq + Hash"
))]
pub struct TraceStep<S> {
    pub task_id: String,
    pub distribution: Distribution<S>,
}

impl<S: Eq + Hash> PartialEq for TraceStep<S> {
    fn eq(&self, other: &Self) -> bool {
        self.task_id == other.task_id && self.distribution == other.distribution
    }
}

// ============================================================================
// Execution Result
// ============================================================================

/// Outcome of running a task sequence through both layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize + Eq + Hash",
    deserialize = "S: Deserialize<'de> + Eq + Hash"
))]
pub struct ExecutionResult<S> {
    pub success: bool,
    /// `F(path)` applied to the initial state.
    pub final_distribution: Distribution<S>,
    /// `G(path)` applied to the initial state.
    pub spec_distribution: Distribution<S>,
    /// Measured `W₁(final, spec)`.
    pub actual_error: f64,
    /// `Σεᵢ + (n−1)·δ_F`.
    pub guaranteed_bound: f64,
    pub path_length: usize,
    /// δ_F used for the bound.
    pub composition_discrepancy: f64,
    /// ε of each task, in path order.
    pub local_errors: Vec<f64>,
    pub failed_at: Option<String>,
    /// Every morphism on the path passed non-expansiveness verification,
    /// so the bound is backed by the composition theorem.
    pub certified: bool,
    pub trace: Vec<TraceStep<S>>,
}

impl<S: Eq + Hash> PartialEq for ExecutionResult<S> {
    fn eq(&self, other: &Self) -> bool {
        let Self {
            success,
            final_distribution,
            spec_distribution,
            actual_error,
            guaranteed_bound,
            path_length,
            composition_discrepancy,
            local_errors,
            failed_at,
            certified,
            trace,
        } = self;

        *success == other.success
            && *final_distribution == other.final_distribution
            && *spec_distribution == other.spec_distribution
            && *actual_error == other.actual_error
            && *guaranteed_bound == other.guaranteed_bound
            && *path_length == other.path_length
            && *composition_discrepancy == other.composition_discrepancy
            && *local_errors == other.local_errors
            && *failed_at == other.failed_at
            && *certified == other.certified
            && *trace == other.trace
    }
}

impl<S> ExecutionResult<S> {
    /// Measured error is within the bound, up to `tolerance`.
    pub fn bound_holds(&self, tolerance: f64) -> bool {
        self.actual_error <= self.guaranteed_bound + tolerance
    }

    /// Room left under the bound (negative if exceeded).
    pub fn slack(&self) -> f64 {
        self.guaranteed_bound - self.actual_error
    }

    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            success: self.success,
            path_length: self.path_length,
            actual_error: self.actual_error,
            guaranteed_bound: self.guaranteed_bound,
            certified: self.certified,
        }
    }
}

impl<S> fmt::Display for ExecutionResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.success, &self.failed_at) {
            (true, _) => write!(f, "ExecutionResult(SUCCESS, ")?,
            (false, Some(id)) => write!(f, "ExecutionResult(FAILED at {id}, ")?,
            (false, None) => write!(f, "ExecutionResult(FAILED, ")?,
        }
        write!(
            f,
            "error={:.4}, bound={:.4})",
            self.actual_error, self.guaranteed_bound
        )
    }
}

/// State-free digest of an [`ExecutionResult`], handed to hooks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub success: bool,
    pub path_length: usize,
    pub actual_error: f64,
    pub guaranteed_bound: f64,
    pub certified: bool,
}

impl ExecutionSummary {
    pub fn bound_holds(&self, tolerance: f64) -> bool {
        self.actual_error <= self.guaranteed_bound + tolerance
    }
}

// ============================================================================
// Local Bound Audit
// ============================================================================

/// Declared ε of one task next to its measured drift `sup_a W₁(F(a), G(a))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalBoundAudit {
    pub task_id: String,
    pub epsilon: f64,
    pub measured: f64,
    /// `measured > epsilon + tolerance`.
    pub exceeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(actual_error: f64, guaranteed_bound: f64) -> ExecutionResult<i64> {
        ExecutionResult {
            success: true,
            final_distribution: Distribution::point(1),
            spec_distribution: Distribution::point(1),
            actual_error,
            guaranteed_bound,
            path_length: 2,
            composition_discrepancy: 0.0,
            local_errors: vec![0.125, 0.125],
            failed_at: None,
            certified: false,
            trace: Vec::new(),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            result(0.25, 0.25).to_string(),
            "ExecutionResult(SUCCESS, error=0.2500, bound=0.2500)"
        );

        let mut failed = result(0.0, 0.1);
        failed.success = false;
        failed.failed_at = Some("deploy".into());
        assert_eq!(
            failed.to_string(),
            "ExecutionResult(FAILED at deploy, error=0.0000, bound=0.1000)"
        );
    }

    #[test]
    fn test_bound_holds_with_tolerance() {
        let r = result(0.25 + 1e-12, 0.25);
        assert!(!r.bound_holds(0.0));
        assert!(r.bound_holds(1e-9));
        assert!(r.slack() < 0.0);
        assert!(r.summary().bound_holds(1e-9));
    }

    #[test]
    fn test_equality_compares_distributions_and_trace() {
        let a = result(0.125, 0.25);
        assert_eq!(a, result(0.125, 0.25));

        let mut moved = result(0.125, 0.25);
        moved.final_distribution = Distribution::point(2);
        assert_ne!(a, moved);

        let mut traced = result(0.125, 0.25);
        traced.trace.push(TraceStep {
            task_id: "a".into(),
            distribution: Distribution::point(1),
        });
        assert_ne!(a, traced);

        let step = |p: f64| TraceStep {
            task_id: "a".to_string(),
            distribution: Distribution::from_raw([(1_i64, p), (2, 1.0 - p)]),
        };
        assert_eq!(step(0.25), step(0.25));
        assert_ne!(step(0.25), step(0.5));
    }

    #[test]
    fn test_serializes_to_json() {
        let mut r = result(0.125, 0.25);
        r.trace.push(TraceStep {
            task_id: "a".into(),
            distribution: Distribution::point(1),
        });
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["path_length"], 2);
        assert_eq!(json["trace"][0]["task_id"], "a");
        assert_eq!(json["final_distribution"]["1"], 1.0);

        let back: ExecutionResult<i64> = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
