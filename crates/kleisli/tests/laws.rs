//! Algebraic and metric laws of the Kleisli category.
//!
//! These are property tests: composition must be associative and unital,
//! composition must preserve normalization, and the greedy transport must be
//! symmetric, reflexive, never below the optimum, and exact on the integer
//! line whenever the optimal plan is forced.

use std::collections::HashMap;

use compositional_kleisli::{
    compose, from_fn, wasserstein1, Absolute, Distribution, Identity, KleisliMorphism,
};
use proptest::prelude::*;

const DOMAIN: i64 = 6;

fn arb_dist() -> impl Strategy<Value = Distribution<i64>> {
    proptest::collection::vec((0..DOMAIN, 0.01_f64..1.0), 1..6)
        .prop_map(|pairs| Distribution::normalized(pairs).expect("positive weights"))
}

/// A random stochastic map on `0..DOMAIN`, given as a lookup table.
/// States outside the table are fixed points.
fn arb_table() -> impl Strategy<Value = HashMap<i64, Distribution<i64>>> {
    proptest::collection::vec(arb_dist(), DOMAIN as usize)
        .prop_map(|rows| (0..DOMAIN).zip(rows).collect())
}

fn table_morphism(table: HashMap<i64, Distribution<i64>>) -> impl KleisliMorphism<i64> {
    from_fn(move |s: &i64| {
        table
            .get(s)
            .cloned()
            .unwrap_or_else(|| Distribution::point(*s))
    })
}

/// Closed-form W₁ on the integer line: `Σ |F_μ(x) − F_ν(x)|` over unit gaps.
fn w1_by_cdf(mu: &Distribution<i64>, nu: &Distribution<i64>) -> f64 {
    let lo = mu.iter().chain(nu.iter()).map(|(s, _)| *s).min().unwrap_or(0);
    let hi = mu.iter().chain(nu.iter()).map(|(s, _)| *s).max().unwrap_or(0);
    let (mut cdf_mu, mut cdf_nu, mut total) = (0.0, 0.0, 0.0);
    for x in lo..hi {
        cdf_mu += mu.prob(&x);
        cdf_nu += nu.prob(&x);
        total += (cdf_mu - cdf_nu).abs();
    }
    total
}

proptest! {
    #[test]
    fn composition_is_associative(
        f in arb_table(),
        g in arb_table(),
        h in arb_table(),
        s in 0..DOMAIN,
    ) {
        let (f, g, h) = (table_morphism(f), table_morphism(g), table_morphism(h));
        let left = compose(&h, compose(&g, &f)).apply(&s);
        let right = compose(compose(&h, &g), &f).apply(&s);
        prop_assert!(left.approx_eq(&right, 1e-9), "left = {left:?}, right = {right:?}");
    }

    #[test]
    fn identity_is_two_sided_unit(f in arb_table(), s in 0..DOMAIN) {
        let f = table_morphism(f);
        let direct = f.apply(&s);
        prop_assert!(compose(&f, Identity).apply(&s).approx_eq(&direct, 1e-12));
        prop_assert!(compose(Identity, &f).apply(&s).approx_eq(&direct, 1e-12));
    }

    #[test]
    fn composition_preserves_normalization(f in arb_table(), g in arb_table(), s in 0..DOMAIN) {
        let out = compose(table_morphism(g), table_morphism(f)).apply(&s);
        prop_assert!(out.iter().all(|(_, p)| p >= 0.0));
        prop_assert!((out.total_mass() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn w1_of_self_is_zero(mu in arb_dist()) {
        prop_assert_eq!(wasserstein1(&mu, &mu, &Absolute), 0.0);
    }

    #[test]
    fn w1_is_symmetric(mu in arb_dist(), nu in arb_dist()) {
        let ab = wasserstein1(&mu, &nu, &Absolute);
        let ba = wasserstein1(&nu, &mu, &Absolute);
        prop_assert!((ab - ba).abs() < 1e-9, "W(mu,nu) = {ab}, W(nu,mu) = {ba}");
    }

    #[test]
    fn w1_is_exact_against_a_point_mass(mu in arb_dist(), x in -3..10_i64) {
        let nu = Distribution::point(x);
        let greedy = wasserstein1(&mu, &nu, &Absolute);
        let exact = w1_by_cdf(&mu, &nu);
        prop_assert!((greedy - exact).abs() < 1e-9, "greedy = {greedy}, exact = {exact}");
    }

    #[test]
    fn w1_is_exact_for_separated_supports(mu in arb_dist(), nu in arb_dist()) {
        let shifted: Distribution<i64> = nu.iter().map(|(s, p)| (s + DOMAIN, p)).collect();
        let greedy = wasserstein1(&mu, &shifted, &Absolute);
        let exact = w1_by_cdf(&mu, &shifted);
        prop_assert!((greedy - exact).abs() < 1e-9, "greedy = {greedy}, exact = {exact}");
    }

    #[test]
    fn w1_never_undercuts_the_optimum(mu in arb_dist(), nu in arb_dist()) {
        let greedy = wasserstein1(&mu, &nu, &Absolute);
        let exact = w1_by_cdf(&mu, &nu);
        prop_assert!(greedy >= exact - 1e-9, "greedy = {greedy}, exact = {exact}");
    }

    #[test]
    fn w1_is_deterministic(mu in arb_dist(), nu in arb_dist()) {
        let first = wasserstein1(&mu, &nu, &Absolute);
        let again = wasserstein1(&mu.clone(), &nu.clone(), &Absolute);
        prop_assert_eq!(first, again);
    }
}

#[test]
fn w1_interleaved_supports_can_exceed_the_optimum() {
    let mu = Distribution::new([(0.0_f64.to_bits(), 0.5), (2.0_f64.to_bits(), 0.5)]).unwrap();
    let nu = Distribution::new([(1.1_f64.to_bits(), 0.5), (3.0_f64.to_bits(), 0.5)]).unwrap();
    let line = |a: &u64, b: &u64| (f64::from_bits(*a) - f64::from_bits(*b)).abs();
    let greedy = wasserstein1(&mu, &nu, &line);
    // Optimal plan 0→1.1, 2→3 costs 1.05; cheapest-first takes 2→1.1 and
    // is left with 0→3.
    assert!((greedy - 1.95).abs() < 1e-9, "greedy = {greedy}");
}

#[test]
fn w1_greedy_is_upper_bound_in_the_plane() {
    // Two points each; the optimal plan is the parallel matching (cost 1),
    // and greedy must find something at least that expensive.
    let euclid = |a: &(i64, i64), b: &(i64, i64)| {
        (((a.0 - b.0).pow(2) + (a.1 - b.1).pow(2)) as f64).sqrt()
    };
    let mu = Distribution::new([((0, 0), 0.5), ((0, 2), 0.5)]).unwrap();
    let nu = Distribution::new([((1, 0), 0.5), ((1, 2), 0.5)]).unwrap();
    let w = wasserstein1(&mu, &nu, &euclid);
    assert!(w >= 1.0 - 1e-12);
}
