//! Analysis threshold configuration types.
//!
//! Every named constant the analysis stages use lives here. Defaults are the
//! calibrated values; a JSON file only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, ValidationResult};

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub distribution: DistributionConfig,

    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(default)]
    pub specificity: SpecificityConfig,

    #[serde(default)]
    pub significance: SignificanceConfig,

    #[serde(default)]
    pub sanity: SanityConfig,

    #[serde(default)]
    pub confidence: ConfidenceConfig,

    #[serde(default)]
    pub recommendation: RecommendationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            distribution: DistributionConfig::default(),
            correlation: CorrelationConfig::default(),
            specificity: SpecificityConfig::default(),
            significance: SignificanceConfig::default(),
            sanity: SanityConfig::default(),
            confidence: ConfidenceConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string. Does not validate semantics.
    pub fn from_json_str(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Canonical JSON used for hashing and snapshots.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// CMS distribution risk bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Share above which a CMS is reported as dominant.
    pub dominance_share: f64,
    /// Normalized HHI above which concentration risk is high.
    pub hhi_high: f64,
    /// Normalized HHI above which concentration risk is medium.
    pub hhi_medium: f64,
    /// Shannon index below which diversity risk is high.
    pub diversity_high_risk: f64,
    /// Shannon index below which diversity risk is medium.
    pub diversity_medium_risk: f64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig {
            dominance_share: 0.6,
            hhi_high: 0.5,
            hhi_medium: 0.25,
            diversity_high_risk: 0.5,
            diversity_medium_risk: 1.0,
        }
    }
}

/// Correlation construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Signals seen on fewer sites are left out of the correlation map.
    pub min_occurrences: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        CorrelationConfig { min_occurrences: 1 }
    }
}

/// Occurrence bands for sample-size adequacy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdequacyBands {
    /// Occurrences at or above this are at least "limited".
    pub limited: u64,
    /// Occurrences at or above this are at least "adequate".
    pub adequate: u64,
    /// Occurrences at or above this are "strong".
    pub strong: u64,
    pub insufficient_score: f64,
    pub limited_score: f64,
    pub adequate_score: f64,
    pub strong_score: f64,
}

impl Default for AdequacyBands {
    fn default() -> Self {
        AdequacyBands {
            limited: 30,
            adequate: 100,
            strong: 300,
            insufficient_score: 0.25,
            limited_score: 0.6,
            adequate_score: 0.85,
            strong_score: 1.0,
        }
    }
}

/// Platform specificity scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecificityConfig {
    /// Occurrences needed before the discriminative method is trusted.
    pub min_sample_for_discriminative: u64,
    /// Top P(CMS|signal) below this scores low regardless of other factors.
    pub discriminative_threshold: f64,
    /// Scale applied to `contrast · top_probability` below the threshold.
    pub below_threshold_factor: f64,
    pub concentration_weight: f64,
    pub adequacy_weight: f64,
    pub adequacy: AdequacyBands,
}

impl Default for SpecificityConfig {
    fn default() -> Self {
        SpecificityConfig {
            min_sample_for_discriminative: 30,
            discriminative_threshold: 0.4,
            below_threshold_factor: 0.25,
            concentration_weight: 0.7,
            adequacy_weight: 0.3,
            adequacy: AdequacyBands::default(),
        }
    }
}

/// Significance testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    /// Best P(CMS|signal) below this makes the test not applicable.
    pub min_correlation: f64,
    /// Tables with at most this many observations use Fisher's exact test.
    pub fisher_max_total: u64,
    /// Any expected cell below this also routes to Fisher's exact test.
    pub min_expected_count: f64,
    /// p below this maps to "use".
    pub use_alpha: f64,
    /// p below this (and not below `use_alpha`) maps to "caution".
    pub caution_alpha: f64,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        SignificanceConfig {
            min_correlation: 0.1,
            fisher_max_total: 100,
            min_expected_count: 5.0,
            use_alpha: 0.01,
            caution_alpha: 0.05,
        }
    }
}

/// Sanity checker tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityConfig {
    /// Allowed absolute deviation of Σ P(CMS|signal) from 1.
    pub sum_tolerance: f64,
    /// Allowed deviation of Σ distribution percentages from 100, in points.
    pub percentage_tolerance: f64,
    /// Correlations above this need `min_support` supporting sites.
    pub high_correlation: f64,
    pub min_support: u64,
    /// Allowed relative error in the Bayes identity.
    pub bayes_tolerance: f64,
}

impl Default for SanityConfig {
    fn default() -> Self {
        SanityConfig {
            sum_tolerance: 0.01,
            percentage_tolerance: 0.5,
            high_correlation: 0.7,
            min_support: 30,
            bayes_tolerance: 0.05,
        }
    }
}

/// Confidence calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Sample/population ratio at or above which the coverage bonus applies.
    pub high_coverage_ratio: f64,
    pub high_coverage_multiplier: f64,
    /// Sample/population ratio below which the thin-evidence penalty applies.
    pub low_coverage_ratio: f64,
    pub low_coverage_multiplier: f64,
    /// p below this gives `strong_p_confidence`.
    pub strong_p_value: f64,
    /// p at or below this gives `moderate_p_confidence`.
    pub moderate_p_value: f64,
    pub strong_p_confidence: f64,
    pub moderate_p_confidence: f64,
    pub weak_p_confidence: f64,
    pub very_high_level: f64,
    pub high_level: f64,
    pub medium_level: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        ConfidenceConfig {
            high_coverage_ratio: 0.2,
            high_coverage_multiplier: 1.1,
            low_coverage_ratio: 0.05,
            low_coverage_multiplier: 0.7,
            strong_p_value: 0.05,
            moderate_p_value: 0.1,
            strong_p_confidence: 0.9,
            moderate_p_confidence: 0.7,
            weak_p_confidence: 0.5,
            very_high_level: 0.8,
            high_level: 0.6,
            medium_level: 0.4,
        }
    }
}

/// Recommendation thresholds and confidence penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Specificity needed (with a "use" test) to retain a signal.
    pub retain_specificity: f64,
    /// Specificity below which a context-dependent signal is filtered.
    pub filter_specificity: f64,
    pub low_warning_penalty: f64,
    pub medium_warning_penalty: f64,
    pub high_warning_penalty: f64,
    /// Applied when the signal's top CMS dominates the corpus.
    pub dominant_platform_penalty: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        RecommendationConfig {
            retain_specificity: 0.5,
            filter_specificity: 0.3,
            low_warning_penalty: 0.95,
            medium_warning_penalty: 0.85,
            high_warning_penalty: 0.7,
            dominant_platform_penalty: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "schema_version": "1.0.0",
            "specificity": { "discriminative_threshold": 0.5 }
        }"#;
        let config = AnalysisConfig::from_json_str(json).unwrap();
        assert_eq!(config.specificity.discriminative_threshold, 0.5);
        assert_eq!(config.specificity.min_sample_for_discriminative, 30);
        assert_eq!(config.significance, SignificanceConfig::default());
    }

    #[test]
    fn missing_schema_version_is_parse_error() {
        let err = AnalysisConfig::from_json_str("{}").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn default_matches_documented_constants() {
        let c = AnalysisConfig::default();
        assert_eq!(c.specificity.min_sample_for_discriminative, 30);
        assert_eq!(c.specificity.discriminative_threshold, 0.4);
        assert_eq!(c.significance.min_correlation, 0.1);
        assert_eq!(c.significance.fisher_max_total, 100);
        assert_eq!(c.significance.use_alpha, 0.01);
        assert_eq!(c.significance.caution_alpha, 0.05);
        assert_eq!(c.sanity.bayes_tolerance, 0.05);
        assert_eq!(c.distribution.dominance_share, 0.6);
    }
}
