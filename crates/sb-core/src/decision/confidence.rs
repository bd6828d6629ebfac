//! Confidence calibration.
//!
//! Stateless helpers turning frequencies, p-values and sets of confidences
//! into a value in [0, 1] plus a qualitative level. Levels are assigned
//! after every adjustment.

use sb_config::ConfidenceConfig;
use sb_math::geometric_mean;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "low"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::VeryHigh => write!(f, "very-high"),
        }
    }
}

/// Calibrated confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub value: f64,
    pub level: ConfidenceLevel,
}

impl Confidence {
    /// Clamp to [0, 1] (NaN becomes 0) and assign the level.
    pub fn new(value: f64, config: &ConfidenceConfig) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let level = if value >= config.very_high_level {
            ConfidenceLevel::VeryHigh
        } else if value >= config.high_level {
            ConfidenceLevel::High
        } else if value >= config.medium_level {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };
        Confidence { value, level }
    }

    /// Scale by a factor and re-level.
    pub fn scaled(self, factor: f64, config: &ConfidenceConfig) -> Self {
        Confidence::new(self.value * factor, config)
    }
}

/// Confidence from an observed frequency and how much of the population
/// backs it.
///
/// ```
/// use sb_config::ConfidenceConfig;
/// use sb_core::decision::{calculate_basic_confidence, ConfidenceLevel};
///
/// let c = calculate_basic_confidence(0.8, 80, 100, &ConfidenceConfig::default());
/// assert!((c.value - 0.88).abs() < 1e-9);
/// assert_eq!(c.level, ConfidenceLevel::VeryHigh);
/// ```
pub fn calculate_basic_confidence(
    frequency: f64,
    sample_size: u64,
    total: u64,
    config: &ConfidenceConfig,
) -> Confidence {
    let ratio = if total == 0 {
        0.0
    } else {
        sample_size as f64 / total as f64
    };
    let multiplier = if ratio >= config.high_coverage_ratio {
        config.high_coverage_multiplier
    } else if ratio < config.low_coverage_ratio {
        config.low_coverage_multiplier
    } else {
        1.0
    };
    Confidence::new(frequency * multiplier, config)
}

/// Confidence implied by a significance-test p-value.
pub fn confidence_from_p_value(p_value: f64, config: &ConfidenceConfig) -> Confidence {
    let value = if p_value < config.strong_p_value {
        config.strong_p_confidence
    } else if p_value <= config.moderate_p_value {
        config.moderate_p_confidence
    } else {
        config.weak_p_confidence
    };
    Confidence::new(value, config)
}

/// Geometric mean of several confidences; empty input gives 0.
///
/// One weak input drags the result down far more than with an arithmetic
/// mean, and any zero input yields zero.
pub fn combine_confidences(values: &[f64], config: &ConfidenceConfig) -> Confidence {
    let clamped: Vec<f64> = values
        .iter()
        .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) })
        .collect();
    Confidence::new(geometric_mean(&clamped), config)
}
