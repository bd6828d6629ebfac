//! Standard normal quantile used for log-odds confidence intervals.

/// Two-sided 95% standard normal quantile.
pub const Z_95: f64 = 1.959_963_984_540_054;
