//! Platform specificity scoring.
//!
//! Two methods, chosen on the signal's occurrence count:
//! - Discriminative: built on P(CMS | signal) once there are enough carriers
//!   to trust it. Combines concentration on the top CMS, sample-size
//!   adequacy, and contrast against that CMS's background share.
//! - Coefficient of variation: for thin samples, how uneven P(signal | CMS)
//!   is across platforms.

use sb_common::CmsName;
use sb_config::{AdequacyBands, SpecificityConfig};
use sb_math::{coefficient_of_variation, mean};
use serde::{Deserialize, Serialize};

use super::correlation::HeaderCmsCorrelation;
use super::distribution::CmsDistribution;

/// Scoring method used for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificityMethod {
    Discriminative,
    CoefficientOfVariation,
}

impl std::fmt::Display for SpecificityMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecificityMethod::Discriminative => write!(f, "discriminative"),
            SpecificityMethod::CoefficientOfVariation => write!(f, "coefficient of variation"),
        }
    }
}

/// Rating of the absolute number of carriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleAdequacy {
    Insufficient,
    Limited,
    Adequate,
    Strong,
}

impl SampleAdequacy {
    pub fn rate(occurrences: u64, bands: &AdequacyBands) -> Self {
        if occurrences >= bands.strong {
            SampleAdequacy::Strong
        } else if occurrences >= bands.adequate {
            SampleAdequacy::Adequate
        } else if occurrences >= bands.limited {
            SampleAdequacy::Limited
        } else {
            SampleAdequacy::Insufficient
        }
    }

    pub fn weight(&self, bands: &AdequacyBands) -> f64 {
        match self {
            SampleAdequacy::Insufficient => bands.insufficient_score,
            SampleAdequacy::Limited => bands.limited_score,
            SampleAdequacy::Adequate => bands.adequate_score,
            SampleAdequacy::Strong => bands.strong_score,
        }
    }
}

/// Specificity score with the diagnostics of the method that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpecificityScore {
    /// Final score in [0, 1].
    pub score: f64,
    pub method: SpecificityMethod,
    pub occurrences: u64,
    pub top_cms: Option<CmsName>,
    pub top_probability: f64,
    pub runner_up_probability: f64,
    /// `top_probability - runner_up_probability`.
    pub concentration_score: f64,
    pub sample_size_adequacy: SampleAdequacy,
    pub adequacy_weight: f64,
    /// Corpus share of the top CMS.
    pub background_share: f64,
    pub background_contrast: f64,
    /// Set when the discriminative method found the top probability under
    /// the threshold.
    pub below_threshold: bool,
    /// Set by the coefficient-of-variation method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficient_of_variation: Option<f64>,
}

impl PlatformSpecificityScore {
    /// True when the score rests on too few carriers to call the signal
    /// confidently non-discriminative.
    pub fn is_insufficient_data(&self) -> bool {
        self.method == SpecificityMethod::CoefficientOfVariation
    }
}

/// Score how strongly a signal singles out one platform.
pub fn score_specificity(
    correlation: &HeaderCmsCorrelation,
    distribution: &CmsDistribution,
    config: &SpecificityConfig,
) -> PlatformSpecificityScore {
    let occurrences = correlation.overall_occurrences;
    let (top_cms, top_probability) = match correlation.top_cms() {
        Some((cms, entry)) => (Some(cms.clone()), entry.probability),
        None => (None, 0.0),
    };
    let runner_up_probability = correlation.runner_up_probability();
    let concentration_score = (top_probability - runner_up_probability).clamp(0.0, 1.0);
    let sample_size_adequacy = SampleAdequacy::rate(occurrences, &config.adequacy);
    let adequacy_weight = sample_size_adequacy.weight(&config.adequacy);
    let background_share = top_cms
        .as_ref()
        .map_or(0.0, |cms| distribution.share(cms));
    let background_contrast = background_contrast(top_probability, background_share);

    let mut result = PlatformSpecificityScore {
        score: 0.0,
        method: SpecificityMethod::Discriminative,
        occurrences,
        top_cms,
        top_probability,
        runner_up_probability,
        concentration_score,
        sample_size_adequacy,
        adequacy_weight,
        background_share,
        background_contrast,
        below_threshold: false,
        coefficient_of_variation: None,
    };

    if occurrences < config.min_sample_for_discriminative {
        let frequencies: Vec<f64> = correlation
            .per_cms_frequency
            .values()
            .map(|f| f.frequency)
            .collect();
        let cv = if mean(&frequencies) > 0.0 {
            coefficient_of_variation(&frequencies)
        } else {
            0.0
        };
        result.method = SpecificityMethod::CoefficientOfVariation;
        result.coefficient_of_variation = Some(cv);
        result.score = clamp_unit(cv);
        return result;
    }

    if top_probability < config.discriminative_threshold {
        result.below_threshold = true;
        result.score =
            clamp_unit(config.below_threshold_factor * background_contrast * top_probability);
        return result;
    }

    let weight_sum = config.concentration_weight + config.adequacy_weight;
    let (wc, wa) = if weight_sum > 0.0 {
        (
            config.concentration_weight / weight_sum,
            config.adequacy_weight / weight_sum,
        )
    } else {
        (1.0, 0.0)
    };
    result.score =
        clamp_unit(background_contrast * (wc * concentration_score + wa * adequacy_weight));
    result
}

/// How far `top_probability` rises above what the corpus mix alone would
/// give, rescaled to [0, 1].
pub fn background_contrast(top_probability: f64, background_share: f64) -> f64 {
    if background_share >= 1.0 {
        return 0.0;
    }
    ((top_probability - background_share) / (1.0 - background_share)).clamp(0.0, 1.0)
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
