//! Hypergeometric distribution and Fisher's exact test for 2x2 tables.
//!
//! Table layout used throughout:
//!
//! ```text
//!               target   other
//!   signal        a        b
//!   no signal     c        d
//! ```
//!
//! With margins fixed, `a` follows a hypergeometric distribution with
//! population `n = a+b+c+d`, `a+c` successes and `a+b` draws.

use super::stable::{log_binomial, log_sum_exp};

/// Relative tolerance used when deciding whether a table is "as or more
/// extreme" than the observed one. Matches the tolerance R uses.
const FISHER_REL_TOL: f64 = 1e-7;

/// `ln P(K = k)` for `K ~ Hypergeometric(population, successes, draws)`.
///
/// `-inf` outside the support.
pub fn hypergeometric_log_pmf(k: u64, population: u64, successes: u64, draws: u64) -> f64 {
    if successes > population || draws > population {
        return f64::NEG_INFINITY;
    }
    let (lo, hi) = support(population, successes, draws);
    if k < lo || k > hi {
        return f64::NEG_INFINITY;
    }
    log_binomial(successes, k) + log_binomial(population - successes, draws - k)
        - log_binomial(population, draws)
}

/// `P(K = k)`; see [`hypergeometric_log_pmf`].
pub fn hypergeometric_pmf(k: u64, population: u64, successes: u64, draws: u64) -> f64 {
    hypergeometric_log_pmf(k, population, successes, draws).exp()
}

/// Support `[lo, hi]` of the hypergeometric distribution.
pub fn support(population: u64, successes: u64, draws: u64) -> (u64, u64) {
    let lo = (successes + draws).saturating_sub(population);
    let hi = successes.min(draws);
    (lo, hi)
}

/// Two-sided p-value of Fisher's exact test.
///
/// Sums the probabilities of every table with the observed margins whose
/// probability does not exceed the observed table's. A table with an empty
/// margin carries no information and yields 1.
pub fn fisher_exact_two_sided(a: u64, b: u64, c: u64, d: u64) -> f64 {
    let n = a + b + c + d;
    let draws = a + b;
    let successes = a + c;
    if n == 0 || draws == 0 || draws == n || successes == 0 || successes == n {
        return 1.0;
    }

    let observed = hypergeometric_log_pmf(a, n, successes, draws);
    let cutoff = observed + FISHER_REL_TOL.ln_1p();
    let (lo, hi) = support(n, successes, draws);

    let extreme: Vec<f64> = (lo..=hi)
        .map(|k| hypergeometric_log_pmf(k, n, successes, draws))
        .filter(|lp| *lp <= cutoff)
        .collect();

    log_sum_exp(&extreme).exp().clamp(0.0, 1.0)
}
