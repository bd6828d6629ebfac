//! Logging configuration.
//!
//! Resolved from `SB_LOG` / `RUST_LOG` (filter directive) and `SB_LOG_FORMAT`,
//! with programmatic overrides applied last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "SB_LOG";
pub const ENV_LOG_FORMAT: &str = "SB_LOG_FORMAT";

/// Where and how events are written. Both formats go to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "console" | "pretty" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" | "ndjson" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default verbosity when no directive is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub const ALL: &'static [LogLevel] = &[
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_ascii_lowercase();
        let folded = match folded.as_str() {
            "warning" => "warn",
            "none" | "quiet" => "off",
            other => other,
        };
        LogLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == folded)
            .ok_or_else(|| format!("unknown log level: {s}"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Full `EnvFilter` directive (e.g. `sb_core=debug,warn`). Takes
    /// precedence over `level` when it parses.
    pub directive: Option<String>,
    /// Timestamps in human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            directive: None,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Read the environment, then apply explicit overrides.
    ///
    /// A bare level in `SB_LOG` sets `level`; anything else is kept as a
    /// filter directive. `RUST_LOG` is consulted only when `SB_LOG` is unset.
    /// An explicit `level` clears any directive from the environment.
    pub fn from_env(level: Option<LogLevel>, format: Option<LogFormat>) -> Self {
        let raw = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
            .ok();
        let format_var = std::env::var(ENV_LOG_FORMAT).ok();
        Self::resolve(raw.as_deref(), format_var.as_deref(), level, format)
    }

    fn resolve(
        log_var: Option<&str>,
        format_var: Option<&str>,
        level: Option<LogLevel>,
        format: Option<LogFormat>,
    ) -> Self {
        let mut config = LogConfig::default();
        if let Some(raw) = log_var.map(str::trim).filter(|s| !s.is_empty()) {
            match raw.parse::<LogLevel>() {
                Ok(parsed) => config.level = parsed,
                Err(_) => config.directive = Some(raw.to_string()),
            }
        }
        if let Some(parsed) = format_var.and_then(|v| v.parse().ok()) {
            config.format = parsed;
        }
        if let Some(level) = level {
            config.level = level;
            config.directive = None;
        }
        if let Some(format) = format {
            config.format = format;
        }
        config
    }

    /// The filter to install. Unparseable directives fall back to `level`.
    pub fn env_filter(&self) -> EnvFilter {
        self.directive
            .as_deref()
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| {
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::from(self.level).into())
                    .parse_lossy("")
            })
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self.directive = None;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_levels_parse_aliases() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Jsonl);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert!("xml".parse::<LogFormat>().is_err());

        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" quiet ".parse::<LogLevel>().unwrap(), LogLevel::Off);
        assert!("loud".parse::<LogLevel>().is_err());
        for level in LogLevel::ALL {
            assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), *level);
        }
    }

    #[test]
    fn bare_level_sets_level_and_directive_is_kept() {
        let config = LogConfig::resolve(Some("debug"), Some("jsonl"), None, None);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.directive, None);
        assert_eq!(config.format, LogFormat::Jsonl);

        let config = LogConfig::resolve(Some("sb_core=trace,warn"), None, None, None);
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.directive.as_deref(), Some("sb_core=trace,warn"));
    }

    #[test]
    fn explicit_overrides_win() {
        let config = LogConfig::resolve(
            Some("sb_core=trace"),
            Some("human"),
            Some(LogLevel::Error),
            Some(LogFormat::Jsonl),
        );
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.directive, None);
        assert_eq!(config.format, LogFormat::Jsonl);
        assert!(!config.with_timestamps(false).timestamps);
    }

    #[test]
    fn env_filter_falls_back_to_level() {
        let config = LogConfig::default()
            .with_level(LogLevel::Warn)
            .with_directive("sb_core=loud");
        assert_eq!(config.env_filter().max_level_hint(), Some(LevelFilter::WARN));

        let config = LogConfig::default().with_directive("sb_core=debug");
        assert_eq!(config.env_filter().max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
