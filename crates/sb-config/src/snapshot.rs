//! Configuration snapshots for reproducible analysis reports.
//!
//! A snapshot captures the exact thresholds in force when a run started, so
//! two reports can be compared and a run can be reproduced later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analysis::AnalysisConfig;
use crate::preset::PresetName;
use crate::resolve::ConfigPaths;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    pub schema_version: String,

    /// SHA-256 of the canonical JSON of the effective configuration.
    pub config_hash: String,

    /// Path the configuration was loaded from.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Where the configuration came from.
    pub source: String,

    /// Preset used when no file was found.
    #[serde(default)]
    pub preset: Option<PresetName>,

    /// Key thresholds for quick reference.
    pub summary: ConfigSummary,
}

/// Key thresholds surfaced in every report header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub min_sample_for_discriminative: u64,
    pub discriminative_threshold: f64,
    pub min_correlation: f64,
    pub use_alpha: f64,
    pub caution_alpha: f64,
    pub retain_specificity: f64,
    pub filter_specificity: f64,
}

impl ConfigSummary {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        ConfigSummary {
            min_sample_for_discriminative: config.specificity.min_sample_for_discriminative,
            discriminative_threshold: config.specificity.discriminative_threshold,
            min_correlation: config.significance.min_correlation,
            use_alpha: config.significance.use_alpha,
            caution_alpha: config.significance.caution_alpha,
            retain_specificity: config.recommendation.retain_specificity,
            filter_specificity: config.recommendation.filter_specificity,
        }
    }
}

impl ConfigSnapshot {
    /// Snapshot a loaded configuration.
    pub fn new(config: &AnalysisConfig, paths: &ConfigPaths, preset: Option<PresetName>) -> Self {
        let preset = if paths.analysis.is_none() {
            Some(preset.unwrap_or(PresetName::Default))
        } else {
            None
        };
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_hash: config_hash(config),
            config_path: paths.analysis.as_ref().map(|p| p.display().to_string()),
            source: paths.source.to_string(),
            preset,
            summary: ConfigSummary::from_config(config),
        }
    }

    /// Snapshot of a configuration built in code (no file, no preset).
    pub fn in_memory(config: &AnalysisConfig) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            config_hash: config_hash(config),
            config_path: None,
            source: "in-memory".to_string(),
            preset: None,
            summary: ConfigSummary::from_config(config),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether two snapshots describe the same effective thresholds.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.config_hash == other.config_hash
    }

    /// Short identifier (first 12 hex chars of the hash).
    pub fn short_id(&self) -> &str {
        &self.config_hash[..12.min(self.config_hash.len())]
    }
}

/// SHA-256 of the canonical config JSON.
pub fn config_hash(config: &AnalysisConfig) -> String {
    let canonical = config.to_canonical_json().unwrap_or_default();
    hash_content(&canonical)
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
