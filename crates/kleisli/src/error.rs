//! Error types for distribution and metric operations.

use thiserror::Error;

/// Errors that can occur in Kleisli computations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KleisliError {
    /// Distribution doesn't sum to 1.
    #[error("Distribution not normalized: sum = {sum} (expected 1.0)")]
    NotNormalized { sum: f64 },

    /// NaN or infinite weight encountered.
    #[error("Non-finite probability encountered")]
    NonFiniteWeight,

    /// Negative weight encountered.
    #[error("Negative probability encountered")]
    NegativeWeight,

    /// Total weight is effectively zero (can't normalize).
    #[error("Cannot normalize: total weight is zero")]
    ZeroWeights,

    /// Non-expansiveness check was given no states to test.
    #[error("Sample states cannot be empty")]
    EmptySample,
}
