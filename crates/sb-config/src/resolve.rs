//! Configuration resolution and loading.
//!
//! Resolution order: explicit path → environment variables → XDG paths →
//! system path → built-in defaults.

use std::path::{Path, PathBuf};

use crate::analysis::AnalysisConfig;
use crate::preset::{get_preset, PresetName};
use crate::snapshot::ConfigSnapshot;
use crate::validate::{validate_config, ValidationError, ValidationResult};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to analysis.json (or None if not found).
    pub analysis: Option<PathBuf>,

    /// Where the path came from (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided by the caller.
    Explicit,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/signal-bias/.
    SystemConfig,

    /// Using built-in defaults (or a named preset).
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit => write!(f, "explicit path"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "SB_CONFIG";
pub const ENV_CONFIG_DIR: &str = "SB_CONFIG_DIR";

/// Standard config file name.
pub const ANALYSIS_FILENAME: &str = "analysis.json";

/// Application name for XDG directories.
const APP_NAME: &str = "signal-bias";

/// Resolve the analysis config path.
///
/// 1. Explicit path (if it exists)
/// 2. `SB_CONFIG`
/// 3. `SB_CONFIG_DIR` + `analysis.json`
/// 4. XDG config directory (`~/.config/signal-bias/`)
/// 5. System config (`/etc/signal-bias/`)
/// 6. Built-in defaults (None)
pub fn resolve_config(explicit: Option<&Path>) -> ConfigPaths {
    if let Some(path) = explicit {
        if path.exists() {
            return found(path.to_path_buf(), ConfigSource::Explicit);
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(ANALYSIS_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(ANALYSIS_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    let system_path = PathBuf::from("/etc").join(APP_NAME).join(ANALYSIS_FILENAME);
    if system_path.exists() {
        return found(system_path, ConfigSource::SystemConfig);
    }

    ConfigPaths::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPaths {
    ConfigPaths {
        analysis: Some(path),
        source,
    }
}

/// A validated configuration together with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AnalysisConfig,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, load and validate the analysis configuration.
///
/// When no file is found the given preset (or the defaults) is used. A
/// missing explicit path, or a file that fails to parse or validate, is an
/// error, never a silent fallback.
pub fn load_config(
    explicit: Option<&Path>,
    preset: Option<PresetName>,
) -> ValidationResult<LoadedConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
    }
    let paths = resolve_config(explicit);
    let config = match &paths.analysis {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => get_preset(preset.unwrap_or(PresetName::Default)),
    };
    validate_config(&config)?;

    let snapshot = ConfigSnapshot::new(&config, &paths, preset);
    Ok(LoadedConfig {
        config,
        paths,
        snapshot,
    })
}
