//! Structured event definitions for logging.
//!
//! Every event carries the run ID and the pipeline stage that emitted it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Analysis pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Corpus validation and configuration.
    Init,
    /// CMS distribution statistics.
    Distribution,
    /// Signal/CMS conditional probabilities.
    Correlate,
    /// Platform specificity scoring.
    Score,
    /// Significance testing.
    Test,
    /// Sanity checks over correlations and distribution.
    Audit,
    /// Static signal classification.
    Classify,
    /// Filter/retain/refine recommendations.
    Recommend,
    /// Report assembly.
    Report,
}

impl Stage {
    pub const ALL: &'static [Stage] = &[
        Stage::Init,
        Stage::Distribution,
        Stage::Correlate,
        Stage::Score,
        Stage::Test,
        Stage::Audit,
        Stage::Classify,
        Stage::Recommend,
        Stage::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Distribution => "distribution",
            Stage::Correlate => "correlate",
            Stage::Score => "score",
            Stage::Test => "test",
            Stage::Audit => "audit",
            Stage::Classify => "classify",
            Stage::Recommend => "recommend",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage: {s}"))
    }
}

/// Standard event names used in logging.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CORPUS_VALIDATED: &str = "corpus.validated";

    pub const DISTRIBUTION_COMPUTED: &str = "distribution.computed";
    pub const DISTRIBUTION_DEGENERATE: &str = "distribution.degenerate";

    pub const CORRELATE_FINISHED: &str = "correlate.finished";
    pub const SCORE_FINISHED: &str = "score.finished";
    pub const TEST_FINISHED: &str = "test.finished";

    pub const AUDIT_HARD_ERROR: &str = "audit.hard_error";
    pub const AUDIT_WARNING: &str = "audit.warning";
    pub const AUDIT_FINISHED: &str = "audit.finished";

    pub const CLASSIFY_FINISHED: &str = "classify.finished";
    pub const RECOMMEND_FINISHED: &str = "recommend.finished";
}

/// One JSONL line as written by [`JsonlLayer`](super::JsonlLayer).
///
/// `run_id` and `stage` come from the event itself or the innermost
/// enclosing span that carries them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub ts: DateTime<Utc>,
    pub level: Level,
    /// Event name (e.g., "run.started"); the tracing target.
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Signal the event concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEvent {
    pub fn new(level: Level, event: impl Into<String>) -> Self {
        LogEvent {
            ts: Utc::now(),
            level,
            event: event.into(),
            run_id: None,
            stage: None,
            signal: None,
            message: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"level":"error","event":"{}","message":"serialization failed"}}"#,
                self.event
            )
        })
    }
}

/// Run-scoped context for [`log_event!`](crate::log_event).
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_event_round_trips_through_jsonl() {
        let mut event = LogEvent::new(Level::Error, event_names::AUDIT_HARD_ERROR)
            .with_message("counts not conserved")
            .with_field("expected", 37)
            .with_field("actual", 36);
        event.run_id = Some("run-0123456789ab".to_string());
        event.stage = Some(Stage::Audit);
        event.signal = Some("header:x-generator".to_string());

        let json = event.to_jsonl();
        assert!(json.contains(r#""event":"audit.hard_error""#));
        assert!(json.contains(r#""stage":"audit""#));
        assert!(json.contains(r#""expected":37"#));
        assert_eq!(serde_json::from_str::<LogEvent>(&json).unwrap(), event);

        let bare = LogEvent::new(Level::Info, "x").to_jsonl();
        assert!(!bare.contains("run_id"));
        assert!(!bare.contains("fields"));
    }

    #[test]
    fn stage_parses_its_own_display() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), *stage);
        }
        assert!("bogus".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [Stage::Init, Stage::Correlate, Stage::Recommend] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
    }
}
