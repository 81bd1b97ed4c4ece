//! Kleisli morphisms (stochastic maps) between states.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dist::Distribution;
use crate::{State, NEGLIGIBLE_MASS};

/// A morphism `A → D(A)` in the Kleisli category of the distribution monad.
///
/// Maps a state to a probability distribution over states. Deterministic
/// functions are the special case where every output is a point mass.
///
/// # Categorical View
///
/// - Objects are state spaces
/// - Composition is Chapman-Kolmogorov marginalization over the intermediate state
/// - Identity is the Dirac delta
pub trait KleisliMorphism<S>: Send + Sync {
    /// Apply the morphism to a single state.
    fn apply(&self, state: &S) -> Distribution<S>;
}

/// Shared, type-erased morphism as stored in task graphs.
pub type Morphism<S> = Arc<dyn KleisliMorphism<S>>;

impl<S, M> KleisliMorphism<S> for Arc<M>
where
    M: KleisliMorphism<S> + ?Sized,
{
    fn apply(&self, state: &S) -> Distribution<S> {
        (**self).apply(state)
    }
}

impl<S, M> KleisliMorphism<S> for Box<M>
where
    M: KleisliMorphism<S> + ?Sized,
{
    fn apply(&self, state: &S) -> Distribution<S> {
        (**self).apply(state)
    }
}

impl<S, M> KleisliMorphism<S> for &M
where
    M: KleisliMorphism<S> + ?Sized,
{
    fn apply(&self, state: &S) -> Distribution<S> {
        (**self).apply(state)
    }
}

// ============================================================================
// Built-in morphisms
// ============================================================================

/// The identity morphism: `x ↦ δ_x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<S: State> KleisliMorphism<S> for Identity {
    fn apply(&self, state: &S) -> Distribution<S> {
        identity(state)
    }
}

/// Identity on a single state: returns `{state: 1.0}`.
pub fn identity<S: State>(state: &S) -> Distribution<S> {
    Distribution::point(state.clone())
}

/// A closure `&S -> Distribution<S>` lifted into a morphism.
///
/// # Example
///
/// ```rust
/// use compositional_kleisli::{from_fn, Distribution, KleisliMorphism};
///
/// let noisy_inc = from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)]));
/// let out = noisy_inc.apply(&5);
/// assert!((out.prob(&6) - 0.9).abs() < 1e-12);
/// ```
#[derive(Clone)]
pub struct FnMorphism<F> {
    f: F,
}

/// Lift a closure into a [`KleisliMorphism`].
pub fn from_fn<S, F>(f: F) -> FnMorphism<F>
where
    F: Fn(&S) -> Distribution<S> + Send + Sync,
{
    FnMorphism { f }
}

impl<S, F> KleisliMorphism<S> for FnMorphism<F>
where
    F: Fn(&S) -> Distribution<S> + Send + Sync,
{
    fn apply(&self, state: &S) -> Distribution<S> {
        (self.f)(state)
    }
}

/// A plain function `&S -> S` viewed as a point-mass morphism.
///
/// This is the embedding of Set into Kl(D): `f ↦ η ∘ f`.
#[derive(Clone)]
pub struct Deterministic<F> {
    f: F,
}

/// Lift a deterministic function into a point-mass morphism.
pub fn deterministic<S, F>(f: F) -> Deterministic<F>
where
    F: Fn(&S) -> S + Send + Sync,
{
    Deterministic { f }
}

impl<S, F> KleisliMorphism<S> for Deterministic<F>
where
    S: State,
    F: Fn(&S) -> S + Send + Sync,
{
    fn apply(&self, state: &S) -> Distribution<S> {
        Distribution::point((self.f)(state))
    }
}

/// Sequential composite `g ∘ f` ("first f, then g").
///
/// `(g ∘ f)(a)(c) = Σ_b f(a)(b) · g(b)(c)`
pub struct Composed<G, F> {
    g: G,
    f: F,
}

/// Chapman-Kolmogorov composition: returns `h` with `h(a) = Σ_b f(a)[b] · g(b)`.
///
/// Argument order follows function composition, so `compose(g, f)` runs `f`
/// first. Intermediate entries with weight below `1e-10` are skipped.
///
/// # Example
///
/// ```rust
/// use compositional_kleisli::{compose, from_fn, Distribution, KleisliMorphism};
///
/// let f = from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.5), (s + 2, 0.5)]));
/// let g = from_fn(|&s: &i64| Distribution::from_raw([(s * 10, 1.0)]));
/// let h = compose(g, f);
/// let out = h.apply(&0);
/// assert!((out.prob(&10) - 0.5).abs() < 1e-12);
/// assert!((out.prob(&20) - 0.5).abs() < 1e-12);
/// ```
pub fn compose<S, G, F>(g: G, f: F) -> Composed<G, F>
where
    S: State,
    G: KleisliMorphism<S>,
    F: KleisliMorphism<S>,
{
    Composed { g, f }
}

impl<S, G, F> KleisliMorphism<S> for Composed<G, F>
where
    S: State,
    G: KleisliMorphism<S>,
    F: KleisliMorphism<S>,
{
    fn apply(&self, state: &S) -> Distribution<S> {
        let mut result: HashMap<S, f64> = HashMap::new();

        for (intermediate, p) in self.f.apply(state).iter() {
            if p < NEGLIGIBLE_MASS {
                continue;
            }
            for (target, q) in self.g.apply(intermediate).iter() {
                *result.entry(target.clone()).or_insert(0.0) += p * q;
            }
        }

        Distribution::from_raw(result)
    }
}

/// Compose a path of morphisms given in execution order.
///
/// `[f₁, f₂, …, fₙ]` becomes `fₙ ∘ … ∘ f₂ ∘ f₁`. An empty path is the identity.
pub fn compose_all<S, I>(path: I) -> Morphism<S>
where
    S: State,
    I: IntoIterator<Item = Morphism<S>>,
{
    path.into_iter()
        .reduce(|acc, next| Arc::new(compose(next, acc)) as Morphism<S>)
        .unwrap_or_else(|| Arc::new(Identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PROB_TOLERANCE;

    fn noisy_step(&s: &i64) -> Distribution<i64> {
        Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)])
    }

    #[test]
    fn test_identity_is_point_mass() {
        let d = Identity.apply(&42_i64);
        assert_eq!(d.prob(&42), 1.0);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_compose_two_noisy_steps() {
        let f = from_fn(noisy_step);
        let h = compose(from_fn(noisy_step), f);
        let d = h.apply(&0);
        assert!((d.prob(&2) - 0.81).abs() < 1e-12);
        assert!((d.prob(&3) - 0.18).abs() < 1e-12);
        assert!((d.prob(&4) - 0.01).abs() < 1e-12);
        assert!(d.is_valid());
    }

    #[test]
    fn test_compose_order_is_f_then_g() {
        let double = deterministic(|&s: &i64| s * 2);
        let inc = deterministic(|&s: &i64| s + 1);
        // (double ∘ inc)(3) = 8, (inc ∘ double)(3) = 7
        assert_eq!(compose(&double, &inc).apply(&3).prob(&8), 1.0);
        assert_eq!(compose(&inc, &double).apply(&3).prob(&7), 1.0);
    }

    #[test]
    fn test_negligible_intermediate_mass_skipped() {
        let f = from_fn(|&s: &i64| Distribution::from_raw([(s, 1.0), (s + 100, 1e-12)]));
        let h = compose(Identity, f);
        let d = h.apply(&0);
        assert_eq!(d.len(), 1);
        assert_eq!(d.prob(&100), 0.0);
    }

    #[test]
    fn test_compose_all_matches_nested_compose() {
        let path: Vec<Morphism<i64>> = vec![
            Arc::new(from_fn(noisy_step)),
            Arc::new(deterministic(|&s: &i64| s * 3)),
            Arc::new(from_fn(noisy_step)),
        ];
        let chained = compose_all(path.clone());
        let nested = compose(path[2].clone(), compose(path[1].clone(), path[0].clone()));
        for s in 0..5 {
            assert!(chained.apply(&s).approx_eq(&nested.apply(&s), PROB_TOLERANCE));
        }
    }

    #[test]
    fn test_compose_all_empty_is_identity() {
        let id = compose_all::<i64, _>(Vec::new());
        assert_eq!(id.apply(&9).prob(&9), 1.0);
    }

    #[test]
    fn test_trait_objects_compose() {
        let f: Morphism<i64> = Arc::new(from_fn(noisy_step));
        let boxed: Box<dyn KleisliMorphism<i64>> = Box::new(Identity);
        let d = compose(boxed, f).apply(&1);
        assert!((d.prob(&2) - 0.9).abs() < 1e-12);
    }
}
