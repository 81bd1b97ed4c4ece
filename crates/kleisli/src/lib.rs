//! # Kleisli - Stochastic Maps over Arbitrary States
//!
//! This crate implements the Kleisli category of the finite distribution
//! monad and the Wasserstein metric structure on it. It generalizes the
//! matrix view of Markov kernels (finite sets indexed `0..n`) to states of
//! any hashable type.
//!
//! ## Core Concepts
//!
//! - **Distributions are the monad**: `D(X)` = finitely supported probability measures on `X`
//! - **Morphisms are stochastic maps**: `f: X → D(X)`
//! - **Composition is marginalization**: `(g ∘ f)(a) = Σ_b f(a)(b) · g(b)` (Chapman-Kolmogorov)
//! - **Identity is the Dirac delta**: `id(x) = δ_x`
//! - **Distance is transport cost**: `W₁` lifts a metric on states to distributions,
//!   and `sup_a W₁(f(a), g(a))` lifts it again to morphisms
//! - **Non-expansiveness** (`W₁(f(x), f(y)) ≤ d(x, y)`) is the regularity condition
//!   under which errors along a composed path add up linearly
//!
//! ## Example: Noisy Counter
//!
//! ```rust
//! use compositional_kleisli::{compose, deterministic, from_fn, wasserstein1, Absolute, Distribution, KleisliMorphism};
//!
//! // Implementation: increments, sometimes by two
//! let noisy = from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)]));
//! // Specification: always increments by one
//! let exact = deterministic(|&s: &i64| s + 1);
//!
//! let two_noisy = compose(&noisy, &noisy);
//! let two_exact = compose(&exact, &exact);
//!
//! let drift = wasserstein1(&two_noisy.apply(&0), &two_exact.apply(&0), &Absolute);
//! assert!((drift - 0.2).abs() < 1e-9);
//! ```

use std::fmt::Debug;
use std::hash::Hash;

mod dist;
mod error;
mod kernel;
mod metric;

pub use dist::Distribution;
pub use error::KleisliError;
pub use kernel::{
    compose, compose_all, deterministic, from_fn, identity, Composed, Deterministic, FnMorphism,
    Identity, KleisliMorphism, Morphism,
};
pub use metric::{
    morphism_distance, verify_non_expansive, wasserstein1, Absolute, Discrete, LipschitzReport,
    Scalar, StateMetric,
};

/// Tolerance for probability comparisons.
pub const PROB_TOLERANCE: f64 = 1e-6;

/// Mass below which an entry is treated as absent during composition and transport.
pub const NEGLIGIBLE_MASS: f64 = 1e-10;

/// Values that can serve as states: comparable, hashable and shareable.
///
/// Blanket-implemented; no structure beyond equality and hashing is assumed.
pub trait State: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> State for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// The Kleisli category of the finite distribution monad.
///
/// - Objects: state spaces
/// - Morphisms: `S → D(S)`
/// - Composition: Chapman-Kolmogorov
/// - Identity: Dirac delta
pub struct Kleisli;

impl Kleisli {
    /// Identity morphism.
    pub fn id() -> Identity {
        Identity
    }

    /// Compose two morphisms: first `f`, then `g`.
    pub fn compose<S, G, F>(g: G, f: F) -> Composed<G, F>
    where
        S: State,
        G: KleisliMorphism<S>,
        F: KleisliMorphism<S>,
    {
        compose(g, f)
    }

    /// A distribution as a constant morphism (a morphism out of the terminal object).
    pub fn constant<S: State>(dist: Distribution<S>) -> impl KleisliMorphism<S> {
        from_fn(move |_: &S| dist.clone())
    }
}
