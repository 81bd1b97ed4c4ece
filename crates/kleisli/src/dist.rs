//! Finitely supported probability distributions over arbitrary states.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::KleisliError;
use crate::kernel::KleisliMorphism;
use crate::{State, NEGLIGIBLE_MASS, PROB_TOLERANCE};

/// A probability distribution with finite support.
///
/// Invariants (for distributions built with [`Distribution::new`] or
/// [`Distribution::normalized`]):
/// - All weights are non-negative
/// - Weights sum to 1 (within [`PROB_TOLERANCE`])
///
/// [`Distribution::from_raw`] skips validation; use [`Distribution::is_valid`]
/// to check such values.
///
/// # Example
///
/// ```rust
/// use compositional_kleisli::Distribution;
///
/// // Fair coin over string states
/// let coin = Distribution::new([("heads", 0.5), ("tails", 0.5)]).unwrap();
/// assert!((coin.prob(&"heads") - 0.5).abs() < 1e-12);
///
/// // Point mass (certain outcome)
/// let certain = Distribution::point(3_i64);
/// assert_eq!(certain.prob(&3), 1.0);
/// assert_eq!(certain.prob(&4), 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(
        serialize = "S: Serialize + Eq + Hash",
        deserialize = "S: Deserialize<'de> + Eq + Hash"
    )
)]
pub struct Distribution<S> {
    weights: HashMap<S, f64>,
}

// Exact comparison of the weight maps; see `approx_eq` for tolerant equality.
impl<S: Eq + Hash> PartialEq for Distribution<S> {
    fn eq(&self, other: &Self) -> bool {
        self.weights == other.weights
    }
}

impl<S: State> Distribution<S> {
    /// Create a validated distribution from `(state, weight)` pairs.
    ///
    /// Repeated states have their weights summed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any weight is NaN or infinite
    /// - Any weight is negative
    /// - The weights don't sum to 1 (within tolerance), including the empty case
    pub fn new(pairs: impl IntoIterator<Item = (S, f64)>) -> Result<Self, KleisliError> {
        let dist = Self::from_raw(pairs);

        if dist.weights.values().any(|w| !w.is_finite()) {
            return Err(KleisliError::NonFiniteWeight);
        }

        if dist.weights.values().any(|&w| w < -PROB_TOLERANCE) {
            return Err(KleisliError::NegativeWeight);
        }

        let sum = dist.total_mass();
        if (sum - 1.0).abs() > PROB_TOLERANCE {
            return Err(KleisliError::NotNormalized { sum });
        }

        Ok(dist)
    }

    /// Create a distribution from unnormalized weights.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compositional_kleisli::Distribution;
    ///
    /// let d = Distribution::normalized([(0, 1.0), (1, 3.0)]).unwrap();
    /// assert!((d.prob(&1) - 0.75).abs() < 1e-12);
    /// ```
    pub fn normalized(pairs: impl IntoIterator<Item = (S, f64)>) -> Result<Self, KleisliError> {
        Self::from_raw(pairs).normalize()
    }

    /// Build a distribution without validating it.
    ///
    /// Repeated states accumulate. This is the constructor used by
    /// morphisms that know their output is already normalized.
    pub fn from_raw(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        let mut weights = HashMap::new();
        for (state, w) in pairs {
            *weights.entry(state).or_insert(0.0) += w;
        }
        Self { weights }
    }

    /// Point mass (Dirac delta) at `state`: the unit of the distribution monad.
    pub fn point(state: S) -> Self {
        let mut weights = HashMap::with_capacity(1);
        weights.insert(state, 1.0);
        Self { weights }
    }

    /// The distribution with empty support. Not a valid probability
    /// distribution; only useful as a degenerate value.
    pub fn empty() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }

    /// Rescale the weights to sum to 1.
    ///
    /// # Errors
    ///
    /// - [`KleisliError::NonFiniteWeight`] if any weight, or the total, is NaN or infinite
    /// - [`KleisliError::NegativeWeight`] if any weight is negative
    /// - [`KleisliError::ZeroWeights`] if the total weight is effectively zero
    pub fn normalize(&self) -> Result<Self, KleisliError> {
        if self.weights.values().any(|w| !w.is_finite()) {
            return Err(KleisliError::NonFiniteWeight);
        }

        if self.weights.values().any(|&w| w < 0.0) {
            return Err(KleisliError::NegativeWeight);
        }

        let total = self.total_mass();
        if !total.is_finite() {
            return Err(KleisliError::NonFiniteWeight);
        }
        if total < NEGLIGIBLE_MASS {
            return Err(KleisliError::ZeroWeights);
        }

        Ok(Self {
            weights: self
                .weights
                .iter()
                .map(|(s, w)| (s.clone(), w / total))
                .collect(),
        })
    }

    /// Probability of `state` (0 outside the support).
    pub fn prob(&self, state: &S) -> f64 {
        self.weights.get(state).copied().unwrap_or(0.0)
    }

    /// Number of states carrying an entry.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the support is empty.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// States with weight above [`PROB_TOLERANCE`].
    pub fn support(&self) -> Vec<&S> {
        self.weights
            .iter()
            .filter(|(_, &w)| w > PROB_TOLERANCE)
            .map(|(s, _)| s)
            .collect()
    }

    /// Iterate over `(state, weight)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, f64)> + '_ {
        self.weights.iter().map(|(s, &w)| (s, w))
    }

    /// Sum of all weights.
    pub fn total_mass(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Check non-negativity and sum-to-one within [`PROB_TOLERANCE`].
    pub fn is_valid(&self) -> bool {
        self.is_valid_with(PROB_TOLERANCE)
    }

    /// Check non-negativity and sum-to-one within `tolerance`.
    pub fn is_valid_with(&self, tolerance: f64) -> bool {
        if self.weights.values().any(|&w| w < -tolerance) {
            return false;
        }
        (self.total_mass() - 1.0).abs() < tolerance
    }

    /// Per-state comparison: every state in either support differs by at
    /// most `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.weights
            .keys()
            .chain(other.weights.keys())
            .all(|s| (self.prob(s) - other.prob(s)).abs() <= tolerance)
    }

    /// Expected value of `f` under this distribution.
    pub fn expectation<F>(&self, f: F) -> f64
    where
        F: Fn(&S) -> f64,
    {
        self.weights.iter().map(|(s, &w)| w * f(s)).sum()
    }

    /// Push this distribution forward through a morphism (Kleisli extension).
    ///
    /// `bind(μ, f)(c) = Σ_b μ(b) · f(b)(c)`
    ///
    /// Intermediate states with weight below `1e-10` are skipped.
    pub fn bind<M>(&self, morphism: &M) -> Self
    where
        M: KleisliMorphism<S> + ?Sized,
    {
        let mut weights: HashMap<S, f64> = HashMap::new();
        for (state, &p) in &self.weights {
            if p < NEGLIGIBLE_MASS {
                continue;
            }
            for (next, q) in morphism.apply(state).iter() {
                *weights.entry(next.clone()).or_insert(0.0) += p * q;
            }
        }
        Self { weights }
    }

    /// Borrow the underlying weight map.
    pub fn as_map(&self) -> &HashMap<S, f64> {
        &self.weights
    }

    /// Consume into the underlying weight map.
    pub fn into_map(self) -> HashMap<S, f64> {
        self.weights
    }
}

impl<S: State> Default for Distribution<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: State> FromIterator<(S, f64)> for Distribution<S> {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::from_raw(iter)
    }
}
