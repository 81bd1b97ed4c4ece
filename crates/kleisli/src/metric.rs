//! Wasserstein metrics on distributions and on Kleisli morphisms.
//!
//! Given a metric `d` on states, this module lifts it twice:
//!
//! 1. To distributions: the Wasserstein-1 (earth mover's) distance `W₁(μ, ν)`
//! 2. To morphisms: `d_Kl(f, g) = sup_a W₁(f(a), g(a))`
//!
//! ## Transport is greedy
//!
//! [`wasserstein1`] does not solve the transport linear program. It
//! repeatedly moves as much mass as possible along the cheapest remaining
//! pair of support points. Every coupling it builds is feasible, so the
//! result is always an upper bound on the true distance. In general metric
//! spaces the gap is unbounded in the worst case; callers that need exact
//! transport must not rely on it.
//!
//! On a line (states embedded in ℝ with `d(x, y) = |x − y|`) the result
//! matches the sorted-quantile formula whenever the optimal plan is forced:
//! one side is a point mass, or the two supports are separated (every point
//! of one lies left of every point of the other). Interleaved supports can
//! still defeat the cheapest-first choice, e.g. `{0, 2}` against `{1.1, 3}`
//! with equal weights gives 1.95 where the optimum is 1.05.
//!
//! Ties are broken deterministically and symmetrically, so
//! `wasserstein1(μ, ν) == wasserstein1(ν, μ)` and repeated calls agree.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::dist::Distribution;
use crate::error::KleisliError;
use crate::kernel::KleisliMorphism;
use crate::{State, NEGLIGIBLE_MASS};

/// A metric on states.
///
/// Implementations are trusted to satisfy `d(x, x) = 0`, symmetry and the
/// triangle inequality. Nothing here verifies the axioms.
///
/// Any `Fn(&S, &S) -> f64 + Send + Sync` is a metric:
///
/// ```rust
/// use compositional_kleisli::StateMetric;
///
/// let d = |a: &i64, b: &i64| (a - b).abs() as f64;
/// assert_eq!(d.distance(&3, &-1), 4.0);
/// ```
pub trait StateMetric<S>: Send + Sync {
    /// Distance between two states.
    fn distance(&self, a: &S, b: &S) -> f64;
}

impl<S, F> StateMetric<S> for F
where
    F: Fn(&S, &S) -> f64 + Send + Sync,
{
    fn distance(&self, a: &S, b: &S) -> f64 {
        self(a, b)
    }
}

/// Numeric states that embed in the real line.
pub trait Scalar {
    /// `|self − other|`, with the difference taken before converting to `f64`.
    fn distance_to(&self, other: &Self) -> f64;
}

// i128 holds every difference of two 64-bit integers exactly.
macro_rules! impl_scalar_int {
    ($($t:ty),*) => {
        $(impl Scalar for $t {
            fn distance_to(&self, other: &Self) -> f64 {
                (*self as i128 - *other as i128).unsigned_abs() as f64
            }
        })*
    };
}

macro_rules! impl_scalar_float {
    ($($t:ty),*) => {
        $(impl Scalar for $t {
            fn distance_to(&self, other: &Self) -> f64 {
                (*self as f64 - *other as f64).abs()
            }
        })*
    };
}

impl_scalar_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_scalar_float!(f32, f64);

/// `d(x, y) = |x − y|` on numeric states.
#[derive(Debug, Clone, Copy, Default)]
pub struct Absolute;

impl<S: Scalar> StateMetric<S> for Absolute {
    fn distance(&self, a: &S, b: &S) -> f64 {
        a.distance_to(b)
    }
}

/// The discrete metric: 0 if equal, 1 otherwise.
///
/// Under this metric W₁ is the total variation distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discrete;

impl<S: PartialEq> StateMetric<S> for Discrete {
    fn distance(&self, a: &S, b: &S) -> f64 {
        if a == b {
            0.0
        } else {
            1.0
        }
    }
}

// ============================================================================
// Wasserstein-1 on distributions
// ============================================================================

/// Wasserstein-1 distance between two discrete distributions, by greedy coupling.
///
/// `W₁(μ, ν) = inf_γ Σ γ(x, y) · d(x, y)` over couplings `γ` of `μ` and `ν`.
///
/// The greedy coupling is an upper bound on the optimum, exact on the line
/// for point masses and separated supports (see the module docs).
///
/// Conventions:
/// - Identical supports with matching weights (within `1e-10`) return 0
///   without searching.
/// - If either distribution has empty support the result is 0. This is a
///   degenerate convention, not a meaningful distance.
///
/// # Example
///
/// ```rust
/// use compositional_kleisli::{wasserstein1, Absolute, Distribution};
///
/// let mu = Distribution::new([(0_i64, 0.5), (2, 0.5)]).unwrap();
/// let nu = Distribution::point(1_i64);
/// assert!((wasserstein1(&mu, &nu, &Absolute) - 1.0).abs() < 1e-12);
/// ```
pub fn wasserstein1<S, M>(mu: &Distribution<S>, nu: &Distribution<S>, metric: &M) -> f64
where
    S: State,
    M: StateMetric<S> + ?Sized,
{
    if mu.is_empty() || nu.is_empty() {
        return 0.0;
    }

    if same_weights(mu, nu) {
        return 0.0;
    }

    let mut left: Vec<(&S, f64)> = mu.iter().filter(|(_, p)| *p >= NEGLIGIBLE_MASS).collect();
    let mut right: Vec<(&S, f64)> = nu.iter().filter(|(_, p)| *p >= NEGLIGIBLE_MASS).collect();

    let costs: Vec<Vec<f64>> = left
        .iter()
        .map(|(x, _)| right.iter().map(|(y, _)| metric.distance(x, y)).collect())
        .collect();

    let left_keys: Vec<u64> = left.iter().map(|(x, _)| state_key(*x)).collect();
    let right_keys: Vec<u64> = right.iter().map(|(y, _)| state_key(*y)).collect();

    let mut total_cost = 0.0;

    loop {
        let mut best: Option<Candidate> = None;
        for (i, (_, p)) in left.iter().enumerate() {
            if *p < NEGLIGIBLE_MASS {
                continue;
            }
            for (j, (_, q)) in right.iter().enumerate() {
                if *q < NEGLIGIBLE_MASS {
                    continue;
                }
                let candidate = Candidate {
                    i,
                    j,
                    cost: costs[i][j],
                    mass: p.min(*q),
                    key: pair_key(left_keys[i], right_keys[j]),
                };
                if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }

        let Some(Candidate { i, j, cost, mass, .. }) = best else {
            break;
        };

        total_cost += mass * cost;
        left[i].1 -= mass;
        right[j].1 -= mass;
    }

    total_cost
}

/// A transport edge considered by the greedy search.
///
/// Ties on cost go to the larger movable mass, then to a hash of the
/// unordered state pair, so the choice does not depend on map iteration
/// order or on which argument came first.
struct Candidate {
    i: usize,
    j: usize,
    cost: f64,
    mass: f64,
    key: (u64, u64),
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.cost != other.cost {
            return self.cost < other.cost;
        }
        if self.mass != other.mass {
            return self.mass > other.mass;
        }
        self.key < other.key
    }
}

fn state_key<S: Hash>(state: &S) -> u64 {
    let mut hasher = DefaultHasher::new();
    state.hash(&mut hasher);
    hasher.finish()
}

fn pair_key(a: u64, b: u64) -> (u64, u64) {
    (a.min(b), a.max(b))
}

fn same_weights<S: State>(mu: &Distribution<S>, nu: &Distribution<S>) -> bool {
    mu.len() == nu.len()
        && mu.iter().all(|(s, p)| {
            nu.as_map()
                .get(s)
                .map_or(false, |q| (p - q).abs() < NEGLIGIBLE_MASS)
        })
}

// ============================================================================
// Lifting to morphisms
// ============================================================================

/// Distance between two morphisms: `sup_a W₁(f(a), g(a))` over `samples`.
///
/// The true supremum ranges over the whole (possibly infinite) state space;
/// this is the maximum over the supplied sample, so its accuracy is bounded
/// by how well the sample covers the space. An empty sample yields 0.
pub fn morphism_distance<S, F, G, M>(f: &F, g: &G, samples: &[S], metric: &M) -> f64
where
    S: State,
    F: KleisliMorphism<S> + ?Sized,
    G: KleisliMorphism<S> + ?Sized,
    M: StateMetric<S> + ?Sized,
{
    samples
        .iter()
        .map(|s| wasserstein1(&f.apply(s), &g.apply(s), metric))
        .fold(0.0, f64::max)
}

/// Outcome of a non-expansiveness (1-Lipschitz) check on a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LipschitzReport {
    /// No pair exceeded `1 + tolerance`.
    pub is_non_expansive: bool,
    /// Largest `W₁(f(s₁), f(s₂)) / d(s₁, s₂)` seen (0 if no pair qualified).
    pub max_ratio: f64,
    /// Number of state pairs with non-zero input distance.
    pub pairs_checked: usize,
}

/// Check `W₁(f(s₁), f(s₂)) ≤ d(s₁, s₂)` for every unordered pair of distinct
/// sample states.
///
/// Pairs at input distance below `1e-10` are skipped. Every qualifying pair
/// is examined, so `max_ratio` is the maximum over the whole sample.
///
/// # Errors
///
/// [`KleisliError::EmptySample`] if `samples` is empty.
///
/// # Example
///
/// ```rust
/// use compositional_kleisli::{deterministic, verify_non_expansive, Absolute};
///
/// let double = deterministic(|&s: &i64| 2 * s);
/// let report = verify_non_expansive(&double, &[0, 1, 2, 3], &Absolute, 1e-6).unwrap();
/// assert!(!report.is_non_expansive);
/// assert!((report.max_ratio - 2.0).abs() < 1e-12);
/// ```
pub fn verify_non_expansive<S, F, M>(
    f: &F,
    samples: &[S],
    metric: &M,
    tolerance: f64,
) -> Result<LipschitzReport, KleisliError>
where
    S: State,
    F: KleisliMorphism<S> + ?Sized,
    M: StateMetric<S> + ?Sized,
{
    if samples.is_empty() {
        return Err(KleisliError::EmptySample);
    }

    let outputs: Vec<Distribution<S>> = samples.iter().map(|s| f.apply(s)).collect();

    let mut max_ratio: f64 = 0.0;
    let mut pairs_checked = 0;

    for i in 0..samples.len() {
        for j in (i + 1)..samples.len() {
            if samples[i] == samples[j] {
                continue;
            }

            let d_in = metric.distance(&samples[i], &samples[j]);
            if d_in < NEGLIGIBLE_MASS {
                continue;
            }

            let d_out = wasserstein1(&outputs[i], &outputs[j], metric);
            max_ratio = max_ratio.max(d_out / d_in);
            pairs_checked += 1;
        }
    }

    Ok(LipschitzReport {
        is_non_expansive: max_ratio <= 1.0 + tolerance,
        max_ratio,
        pairs_checked,
    })
}
