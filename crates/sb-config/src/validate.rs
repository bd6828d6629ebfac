//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::analysis::{
    AdequacyBands, AnalysisConfig, ConfidenceConfig, DistributionConfig, RecommendationConfig,
    SanityConfig, SignificanceConfig, SpecificityConfig,
};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 12,
            ValidationError::ParseError(_) => 13,
            ValidationError::SemanticError(_) => 14,
            ValidationError::InvalidValue { .. } => 15,
            ValidationError::VersionMismatch { .. } => 16,
        }
    }
}

/// Validate an analysis configuration semantically.
pub fn validate_config(config: &AnalysisConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_distribution(&config.distribution)?;
    validate_specificity(&config.specificity)?;
    validate_significance(&config.significance)?;
    validate_sanity(&config.sanity)?;
    validate_confidence(&config.confidence)?;
    validate_recommendation(&config.recommendation)?;
    Ok(())
}

fn validate_distribution(c: &DistributionConfig) -> ValidationResult<()> {
    unit_interval("distribution.dominance_share", c.dominance_share)?;
    unit_interval("distribution.hhi_high", c.hhi_high)?;
    unit_interval("distribution.hhi_medium", c.hhi_medium)?;
    ordered("distribution.hhi_medium", c.hhi_medium, "hhi_high", c.hhi_high)?;
    non_negative("distribution.diversity_high_risk", c.diversity_high_risk)?;
    non_negative("distribution.diversity_medium_risk", c.diversity_medium_risk)?;
    ordered(
        "distribution.diversity_high_risk",
        c.diversity_high_risk,
        "diversity_medium_risk",
        c.diversity_medium_risk,
    )
}

fn validate_specificity(c: &SpecificityConfig) -> ValidationResult<()> {
    unit_interval(
        "specificity.discriminative_threshold",
        c.discriminative_threshold,
    )?;
    unit_interval("specificity.below_threshold_factor", c.below_threshold_factor)?;
    non_negative("specificity.concentration_weight", c.concentration_weight)?;
    non_negative("specificity.adequacy_weight", c.adequacy_weight)?;
    if c.concentration_weight + c.adequacy_weight <= 0.0 {
        return Err(ValidationError::SemanticError(format!(
            "specificity weights must have a positive sum (concentration={}, adequacy={})",
            c.concentration_weight, c.adequacy_weight
        )));
    }
    validate_adequacy(&c.adequacy)
}

fn validate_adequacy(b: &AdequacyBands) -> ValidationResult<()> {
    if !(b.limited <= b.adequate && b.adequate <= b.strong) {
        return Err(ValidationError::SemanticError(format!(
            "adequacy bands must be ordered limited <= adequate <= strong, got {} / {} / {}",
            b.limited, b.adequate, b.strong
        )));
    }
    for (field, value) in [
        ("specificity.adequacy.insufficient_score", b.insufficient_score),
        ("specificity.adequacy.limited_score", b.limited_score),
        ("specificity.adequacy.adequate_score", b.adequate_score),
        ("specificity.adequacy.strong_score", b.strong_score),
    ] {
        unit_interval(field, value)?;
    }
    Ok(())
}

fn validate_significance(c: &SignificanceConfig) -> ValidationResult<()> {
    unit_interval("significance.min_correlation", c.min_correlation)?;
    unit_interval("significance.use_alpha", c.use_alpha)?;
    unit_interval("significance.caution_alpha", c.caution_alpha)?;
    if c.use_alpha >= c.caution_alpha {
        return Err(ValidationError::SemanticError(format!(
            "significance.use_alpha ({}) must be below caution_alpha ({})",
            c.use_alpha, c.caution_alpha
        )));
    }
    non_negative("significance.min_expected_count", c.min_expected_count)
}

fn validate_sanity(c: &SanityConfig) -> ValidationResult<()> {
    unit_interval("sanity.sum_tolerance", c.sum_tolerance)?;
    non_negative("sanity.percentage_tolerance", c.percentage_tolerance)?;
    unit_interval("sanity.high_correlation", c.high_correlation)?;
    unit_interval("sanity.bayes_tolerance", c.bayes_tolerance)
}

fn validate_confidence(c: &ConfidenceConfig) -> ValidationResult<()> {
    unit_interval("confidence.high_coverage_ratio", c.high_coverage_ratio)?;
    unit_interval("confidence.low_coverage_ratio", c.low_coverage_ratio)?;
    ordered(
        "confidence.low_coverage_ratio",
        c.low_coverage_ratio,
        "high_coverage_ratio",
        c.high_coverage_ratio,
    )?;
    non_negative(
        "confidence.high_coverage_multiplier",
        c.high_coverage_multiplier,
    )?;
    non_negative("confidence.low_coverage_multiplier", c.low_coverage_multiplier)?;
    ordered(
        "confidence.strong_p_value",
        c.strong_p_value,
        "moderate_p_value",
        c.moderate_p_value,
    )?;
    for (field, value) in [
        ("confidence.strong_p_confidence", c.strong_p_confidence),
        ("confidence.moderate_p_confidence", c.moderate_p_confidence),
        ("confidence.weak_p_confidence", c.weak_p_confidence),
        ("confidence.very_high_level", c.very_high_level),
        ("confidence.high_level", c.high_level),
        ("confidence.medium_level", c.medium_level),
    ] {
        unit_interval(field, value)?;
    }
    if !(c.medium_level <= c.high_level && c.high_level <= c.very_high_level) {
        return Err(ValidationError::SemanticError(format!(
            "confidence levels must be ordered medium <= high <= very_high, got {} / {} / {}",
            c.medium_level, c.high_level, c.very_high_level
        )));
    }
    Ok(())
}

fn validate_recommendation(c: &RecommendationConfig) -> ValidationResult<()> {
    unit_interval("recommendation.retain_specificity", c.retain_specificity)?;
    unit_interval("recommendation.filter_specificity", c.filter_specificity)?;
    ordered(
        "recommendation.filter_specificity",
        c.filter_specificity,
        "retain_specificity",
        c.retain_specificity,
    )?;
    for (field, value) in [
        ("recommendation.low_warning_penalty", c.low_warning_penalty),
        ("recommendation.medium_warning_penalty", c.medium_warning_penalty),
        ("recommendation.high_warning_penalty", c.high_warning_penalty),
        (
            "recommendation.dominant_platform_penalty",
            c.dominant_platform_penalty,
        ),
    ] {
        unit_interval(field, value)?;
    }
    Ok(())
}

fn unit_interval(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be in [0, 1], got {}", value),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_nan() || value < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be non-negative, got {}", value),
        });
    }
    Ok(())
}

fn ordered(low_field: &str, low: f64, high_name: &str, high: f64) -> ValidationResult<()> {
    if low > high {
        return Err(ValidationError::InvalidValue {
            field: low_field.to_string(),
            message: format!("Must not exceed {} ({}), got {}", high_name, high, low),
        });
    }
    Ok(())
}
