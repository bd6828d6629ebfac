//! Chi-square distribution tail for independence tests.

use super::incomplete_gamma::gamma_q;

/// Upper-tail probability `P(X > x)` for `X ~ χ²(df)`.
///
/// This is the p-value of an observed chi-square statistic. Returns 1 for
/// `x <= 0` and NaN for non-positive `df`.
pub fn chi_square_survival(x: f64, df: f64) -> f64 {
    if x.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }
    gamma_q(df / 2.0, x / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn df1_critical_values() {
        // 3.841 and 6.635 are the 5% and 1% critical values at df = 1.
        let p05 = chi_square_survival(3.841_458_820_694_124, 1.0);
        let p01 = chi_square_survival(6.634_896_601_021_214, 1.0);
        assert!((p05 - 0.05).abs() < 1e-8, "p at 3.841 = {}", p05);
        assert!((p01 - 0.01).abs() < 1e-8, "p at 6.635 = {}", p01);
    }

    #[test]
    fn df2_is_exponential() {
        // χ²(2) survival is e^(-x/2)
        let x: f64 = 4.0;
        assert!((chi_square_survival(x, 2.0) - (-x / 2.0).exp()).abs() < 1e-10);
    }

    #[test]
    fn non_positive_statistic() {
        assert_eq!(chi_square_survival(0.0, 1.0), 1.0);
        assert_eq!(chi_square_survival(-1.0, 1.0), 1.0);
        assert!(chi_square_survival(1.0, 0.0).is_nan());
    }
}
