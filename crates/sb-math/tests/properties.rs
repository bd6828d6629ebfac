//! Property-based tests for sb-math numerical functions.

use proptest::prelude::*;
use sb_math::{
    chi_square_survival, coefficient_of_variation, fisher_exact_two_sided, gamma_q,
    geometric_mean, herfindahl_index, hypergeometric_pmf, log_binomial, log_sum_exp,
    shannon_index, support,
};

const TOL: f64 = 1e-10;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

fn shares_from(weights: &[u32]) -> Vec<f64> {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return Vec::new();
    }
    weights.iter().map(|w| *w as f64 / total as f64).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Order of terms does not change log_sum_exp.
    #[test]
    fn log_sum_exp_commutative(a in -100.0..100.0f64, b in -100.0..100.0f64) {
        prop_assert!(approx_eq(log_sum_exp(&[a, b]), log_sum_exp(&[b, a]), TOL));
    }

    /// Pascal's rule in log space.
    #[test]
    fn log_binomial_pascal(n in 2u64..200, k in 1u64..199) {
        prop_assume!(k < n);
        let lhs = log_binomial(n, k);
        let rhs = log_sum_exp(&[log_binomial(n - 1, k - 1), log_binomial(n - 1, k)]);
        prop_assert!(approx_eq(lhs, rhs, 1e-8), "C({},{}) {} vs {}", n, k, lhs, rhs);
    }

    /// Q stays a probability and never increases in x, across the
    /// series/continued-fraction switch.
    #[test]
    fn incomplete_gamma_monotone(a in 0.1..50.0f64, x in 0.0..100.0f64, dx in 0.0..5.0f64) {
        let q = gamma_q(a, x);
        prop_assert!((0.0..=1.0).contains(&q), "Q({},{}) = {}", a, x, q);
        prop_assert!(gamma_q(a, x + dx) <= q + 1e-9, "Q not monotone at ({},{})", a, x);
    }

    /// Survival is non-increasing in the statistic.
    #[test]
    fn chi_square_survival_monotone(x in 0.0..40.0f64, dx in 0.0..5.0f64) {
        prop_assert!(chi_square_survival(x + dx, 1.0) <= chi_square_survival(x, 1.0) + 1e-12);
    }

    /// Hypergeometric PMF sums to one over its support.
    #[test]
    fn hypergeometric_normalized(n in 1u64..120, s in 0u64..120, d in 0u64..120) {
        prop_assume!(s <= n && d <= n);
        let (lo, hi) = support(n, s, d);
        let total: f64 = (lo..=hi).map(|k| hypergeometric_pmf(k, n, s, d)).sum();
        prop_assert!(approx_eq(total, 1.0, 1e-8), "sum = {}", total);
    }

    /// Fisher p-values are probabilities and invariant to transposition.
    #[test]
    fn fisher_in_unit_interval(a in 0u64..40, b in 0u64..40, c in 0u64..40, d in 0u64..40) {
        let p = fisher_exact_two_sided(a, b, c, d);
        prop_assert!((0.0..=1.0).contains(&p), "p = {}", p);
        let t = fisher_exact_two_sided(a, c, b, d);
        prop_assert!(approx_eq(p, t, 1e-9), "p {} vs transposed {}", p, t);
    }

    /// CV is scale-invariant.
    #[test]
    fn cv_scale_invariant(v in prop::collection::vec(0.01..1.0f64, 2..12), k in 0.1..10.0f64) {
        let scaled: Vec<f64> = v.iter().map(|x| x * k).collect();
        prop_assert!(approx_eq(coefficient_of_variation(&v), coefficient_of_variation(&scaled), 1e-9));
    }

    /// Geometric mean lies between min and max.
    #[test]
    fn geometric_mean_bounded(v in prop::collection::vec(0.01..1.0f64, 1..10)) {
        let g = geometric_mean(&v);
        let lo = v.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(g >= lo - 1e-12 && g <= hi + 1e-12);
    }

    /// HHI lies in [1/k, 1] and Shannon in [0, ln k].
    #[test]
    fn concentration_bounds(weights in prop::collection::vec(1u32..1000, 1..12)) {
        let shares = shares_from(&weights);
        let k = shares.len() as f64;
        let hhi = herfindahl_index(&shares);
        let h = shannon_index(&shares);
        prop_assert!(hhi >= 1.0 / k - 1e-12 && hhi <= 1.0 + 1e-12);
        prop_assert!(h >= 0.0 && h <= k.ln() + 1e-12);
    }
}
