//! Configuration presets for common analysis postures.
//!
//! - Default: the calibrated thresholds
//! - Strict: more evidence before a signal is trusted, tighter alphas
//! - Exploratory: surfaces candidate signals from small crawls for review

use crate::analysis::AnalysisConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Calibrated defaults
    Default,
    /// Larger samples, lower alphas, higher retain bar
    Strict,
    /// Smaller samples accepted, candidates flagged for refinement
    Exploratory,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Default,
        PresetName::Strict,
        PresetName::Exploratory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Default => "default",
            PresetName::Strict => "strict",
            PresetName::Exploratory => "exploratory",
        }
    }

    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "default" | "standard" => Some(PresetName::Default),
            "strict" | "conservative" => Some(PresetName::Strict),
            "exploratory" | "explore" | "discovery" => Some(PresetName::Exploratory),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Default => "Calibrated thresholds for crawls of a few thousand sites",
            PresetName::Strict => {
                "Requires 50+ supporting sites and p < 0.005 before a signal is retained"
            }
            PresetName::Exploratory => {
                "Accepts 20-site samples and looser alphas; use to shortlist signals"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => write!(
                f,
                "Unknown preset '{}'. Available: {}",
                name,
                PresetName::ALL
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl std::error::Error for PresetError {}

/// Build the configuration for a preset.
pub fn get_preset(name: PresetName) -> AnalysisConfig {
    match name {
        PresetName::Default => AnalysisConfig::default(),
        PresetName::Strict => strict_preset(),
        PresetName::Exploratory => exploratory_preset(),
    }
}

fn strict_preset() -> AnalysisConfig {
    let mut config = AnalysisConfig {
        description: Some(PresetName::Strict.description().to_string()),
        ..AnalysisConfig::default()
    };
    config.specificity.min_sample_for_discriminative = 50;
    config.specificity.discriminative_threshold = 0.5;
    config.significance.use_alpha = 0.005;
    config.significance.caution_alpha = 0.01;
    config.sanity.min_support = 50;
    config.recommendation.retain_specificity = 0.6;
    config.recommendation.filter_specificity = 0.35;
    config
}

fn exploratory_preset() -> AnalysisConfig {
    let mut config = AnalysisConfig {
        description: Some(PresetName::Exploratory.description().to_string()),
        ..AnalysisConfig::default()
    };
    config.specificity.min_sample_for_discriminative = 20;
    config.specificity.discriminative_threshold = 0.35;
    config.significance.caution_alpha = 0.1;
    config.sanity.min_support = 20;
    config.recommendation.retain_specificity = 0.45;
    config.recommendation.filter_specificity = 0.2;
    config
}
