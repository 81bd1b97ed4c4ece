//! Validators: per-task comparison of implementation against specification.
//!
//! A validator is a check, not a worker. It maps an observed state to a
//! distribution over states judged compliant, and it declares a local error
//! bound ε. The engine reads ε to build the compositional bound and never
//! routes execution through `validate`.

use compositional_kleisli::{Distribution, State};
use serde::{Deserialize, Serialize};

/// A validator for states of type `S`.
pub trait Validator<S>: Send + Sync {
    /// Compare an observed state against the specification.
    fn validate(&self, state: &S) -> Distribution<S>;

    /// Local error bound ε (non-negative).
    fn epsilon(&self) -> f64;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// Pass-through
// ============================================================================

/// Deterministic identity judgment with a fixed ε.
///
/// Every observed state is judged compliant with itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassThroughValidator {
    pub epsilon: f64,
}

impl PassThroughValidator {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl<S: State> Validator<S> for PassThroughValidator {
    fn validate(&self, state: &S) -> Distribution<S> {
        Distribution::point(state.clone())
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn name(&self) -> &str {
        "pass-through"
    }
}

// ============================================================================
// Recorded external judgment
// ============================================================================

/// Acceptance limits for a [`Judgment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentThresholds {
    /// Maximum object error.
    pub epsilon: f64,
    /// Maximum integration (morphism) error.
    pub laxity: f64,
}

impl Default for JudgmentThresholds {
    fn default() -> Self {
        Self {
            epsilon: 0.15,
            laxity: 0.15,
        }
    }
}

/// Verdict produced by an external judge (a critic model, a test suite, a human).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    /// Object error: how far the artifact is from its own specification.
    pub epsilon: f64,
    /// Morphism error: how far it is from integrating with its inputs.
    pub laxity: f64,
    /// Free-form critique.
    #[serde(default)]
    pub feedback: String,
}

impl Judgment {
    pub fn new(epsilon: f64, laxity: f64, feedback: impl Into<String>) -> Self {
        Self {
            epsilon,
            laxity,
            feedback: feedback.into(),
        }
    }

    /// Both errors are strictly below their thresholds.
    pub fn is_success(&self, thresholds: &JudgmentThresholds) -> bool {
        self.epsilon < thresholds.epsilon && self.laxity < thresholds.laxity
    }
}

/// A validator whose ε comes from a recorded [`Judgment`].
///
/// The judgment already happened outside the core, so `validate` is the
/// identity judgment.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgedValidator {
    judgment: Judgment,
}

impl JudgedValidator {
    pub fn new(judgment: Judgment) -> Self {
        Self { judgment }
    }

    pub fn judgment(&self) -> &Judgment {
        &self.judgment
    }
}

impl<S: State> Validator<S> for JudgedValidator {
    fn validate(&self, state: &S) -> Distribution<S> {
        Distribution::point(state.clone())
    }

    fn epsilon(&self) -> f64 {
        self.judgment.epsilon
    }

    fn name(&self) -> &str {
        "judged"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_is_point_mass() {
        let v = PassThroughValidator::new(0.1);
        let d = Validator::<i64>::validate(&v, &7);
        assert_eq!(d.prob(&7), 1.0);
        assert_eq!(Validator::<i64>::epsilon(&v), 0.1);
    }

    #[test]
    fn test_judgment_thresholds() {
        let ok = Judgment::new(0.05, 0.1, "clean");
        let lax = Judgment::new(0.05, 0.2, "wiring is off");
        let at_limit = Judgment::new(0.15, 0.0, "");
        let limits = JudgmentThresholds::default();
        assert!(ok.is_success(&limits));
        assert!(!lax.is_success(&limits));
        assert!(!at_limit.is_success(&limits));
    }

    #[test]
    fn test_judged_validator_epsilon() {
        let v = JudgedValidator::new(Judgment::new(0.12, 0.03, "minor drift"));
        assert_eq!(Validator::<&str>::epsilon(&v), 0.12);
        assert_eq!(Validator::<&str>::name(&v), "judged");
        assert_eq!(v.judgment().feedback, "minor drift");
    }

    #[test]
    fn test_judgment_deserializes_without_feedback() {
        let j: Judgment = serde_json::from_str(r#"{"epsilon": 0.1, "laxity": 0.2}"#).unwrap();
        assert_eq!(j.feedback, "");
        assert_eq!(j.laxity, 0.2);
    }
}
