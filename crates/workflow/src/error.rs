//! # Error Types
//!
//! Errors in a workflow are reported to the immediate caller and never
//! retried. Graph mutations that fail leave the graph exactly as it was.

use compositional_kleisli::KleisliError;
use thiserror::Error;

/// Which side of a task a morphism belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The noisy, real behavior `F(task)`.
    Implementation,
    /// The idealized behavior `G(task)`.
    Specification,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Implementation => write!(f, "implementation"),
            Layer::Specification => write!(f, "specification"),
        }
    }
}

/// Errors raised while building or executing a task graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    /// A task with this id is already in the graph.
    #[error("Task '{id}' already exists")]
    DuplicateTask { id: String },

    /// An edge or sequence referenced a task that isn't in the graph.
    #[error("Unknown task: '{id}'")]
    UnknownTask { id: String },

    /// Verification was requested but the graph has no state metric.
    #[error("Task '{id}': a state metric is required for non-expansiveness verification")]
    MissingMetric { id: String },

    /// Verification was requested with no sample states.
    #[error("Task '{id}': sample states are required for non-expansiveness verification")]
    EmptySample { id: String },

    /// The edge would close a directed cycle; the graph is unchanged.
    #[error("Adding dependency {from} → {to} would create a cycle")]
    CycleDetected { from: String, to: String },

    /// A morphism failed the non-expansiveness check; the task was not inserted.
    #[error("Task '{id}' {layer} violates the regularity assumption (non-expansive). Max ratio: {ratio:.4}")]
    RegularityViolation { id: String, layer: Layer, ratio: f64 },

    /// A validator reported a negative or non-finite local error bound.
    #[error("Task '{id}' reported invalid epsilon {epsilon}")]
    InvalidEpsilon { id: String, epsilon: f64 },

    /// Engine configuration is out of range or unparsable.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Distribution or metric failure.
    #[error(transparent)]
    Kleisli(#[from] KleisliError),
}
