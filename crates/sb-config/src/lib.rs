//! Signal-bias configuration loading and validation.
//!
//! This crate provides:
//! - Typed thresholds for every analysis stage ([`AnalysisConfig`])
//! - Config resolution (explicit path → env → XDG → defaults)
//! - Semantic validation
//! - Presets for common analysis postures
//! - Config snapshots embedded in every report for reproducibility
//!
//! Configuration is always passed explicitly to the analysis functions; there
//! is no process-wide mutable configuration.

pub mod analysis;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use analysis::{
    AdequacyBands, AnalysisConfig, ConfidenceConfig, CorrelationConfig, DistributionConfig,
    RecommendationConfig, SanityConfig, SignificanceConfig, SpecificityConfig,
};
pub use preset::{get_preset, PresetName};
pub use resolve::{load_config, resolve_config, ConfigPaths, ConfigSource, LoadedConfig};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for analysis configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
