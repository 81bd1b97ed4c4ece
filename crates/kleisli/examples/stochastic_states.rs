//! Stochastic Maps over Arbitrary States
//!
//! Run with: cargo run -p compositional-kleisli --example stochastic_states
//!
//! This example demonstrates:
//! - Distributions keyed by ordinary Rust values
//! - Kleisli composition (Chapman-Kolmogorov) of noisy transitions
//! - Wasserstein-1 distance between implementation and specification
//! - Checking the non-expansiveness condition on a sample

use compositional_kleisli::{
    compose, compose_all, deterministic, from_fn, morphism_distance, verify_non_expansive,
    wasserstein1, Absolute, Discrete, Distribution, KleisliError, KleisliMorphism, Morphism,
    State,
};
use std::sync::Arc;

fn main() -> Result<(), KleisliError> {
    println!("=== Stochastic Maps over Arbitrary States ===\n");

    // -------------------------------------------------------------------------
    // 1. Distributions over any hashable state
    // -------------------------------------------------------------------------
    println!("1. Distributions");
    println!("----------------");

    let weather = Distribution::new([("sun", 0.6), ("rain", 0.3), ("snow", 0.1)])?;
    println!("Weather:      {:?}", sorted(&weather));
    println!("P(rain):      {:.2}", weather.prob(&"rain"));

    let unnormalized = Distribution::normalized([(1_i64, 2.0), (2, 6.0)])?;
    println!("Normalized:   {:?}", sorted(&unnormalized));
    println!();

    // -------------------------------------------------------------------------
    // 2. Composition
    // -------------------------------------------------------------------------
    println!("2. Kleisli composition");
    println!("----------------------");

    let noisy = from_fn(|&s: &i64| Distribution::from_raw([(s + 1, 0.9), (s + 2, 0.1)]));
    let exact = deterministic(|&s: &i64| s + 1);

    let twice = compose(&noisy, &noisy);
    println!("noisy ∘ noisy from 0: {:?}", sorted(&twice.apply(&0)));

    let path: Vec<Morphism<i64>> = vec![
        Arc::new(noisy.clone()),
        Arc::new(noisy.clone()),
        Arc::new(noisy.clone()),
    ];
    let three = compose_all(path);
    println!("three noisy steps:    {:?}", sorted(&three.apply(&0)));
    println!();

    // -------------------------------------------------------------------------
    // 3. Distances
    // -------------------------------------------------------------------------
    println!("3. Wasserstein-1");
    println!("----------------");

    let drift = wasserstein1(&noisy.apply(&0), &exact.apply(&0), &Absolute);
    println!("W₁(noisy(0), exact(0))         = {drift:.4}");

    let sup = morphism_distance(&noisy, &exact, &[0, 5, 10], &Absolute);
    println!("sup over samples               = {sup:.4}");

    let discrete = wasserstein1(&noisy.apply(&0), &exact.apply(&0), &Discrete);
    println!("same pair under discrete metric = {discrete:.4}");
    println!();

    // -------------------------------------------------------------------------
    // 4. Non-expansiveness
    // -------------------------------------------------------------------------
    println!("4. Non-expansiveness");
    println!("--------------------");

    let samples: Vec<i64> = (0..6).collect();
    let report = verify_non_expansive(&noisy, &samples, &Absolute, 1e-6)?;
    println!("noisy increment: {report:?}");

    let doubling = deterministic(|&s: &i64| 2 * s);
    let report = verify_non_expansive(&doubling, &samples, &Absolute, 1e-6)?;
    println!("doubling:        {report:?}");

    Ok(())
}

fn sorted<S: State + Ord + Copy>(dist: &Distribution<S>) -> Vec<(S, f64)> {
    let mut pairs: Vec<(S, f64)> = dist.iter().map(|(s, p)| (*s, p)).collect();
    pairs.sort_by_key(|(s, _)| *s);
    pairs
}
