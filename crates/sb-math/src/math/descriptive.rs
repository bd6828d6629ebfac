//! Descriptive statistics over small vectors of shares and frequencies.

/// Arithmetic mean; 0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`); 0 for empty input.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Coefficient of variation `stddev / mean`.
///
/// A zero (or non-finite) mean yields 0: a vector with no mass has no spread
/// worth reporting.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 || !m.is_finite() {
        return 0.0;
    }
    population_stddev(values) / m
}

/// Geometric mean of non-negative values.
///
/// Empty input yields 0, and so does any zero entry.
pub fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() || values.iter().any(|v| *v <= 0.0 || v.is_nan()) {
        return 0.0;
    }
    let log_mean = values.iter().map(|v| v.ln()).sum::<f64>() / values.len() as f64;
    log_mean.exp()
}

/// Shannon entropy `-Σ p ln p` over shares, skipping zero shares.
pub fn shannon_index(shares: &[f64]) -> f64 {
    shares
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.ln())
        .sum::<f64>()
        .max(0.0)
}

/// Herfindahl–Hirschman index `Σ p²` over shares in `[0, 1]`.
pub fn herfindahl_index(shares: &[f64]) -> f64 {
    shares.iter().map(|p| p * p).sum()
}
