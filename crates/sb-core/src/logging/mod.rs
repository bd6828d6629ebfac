//! Structured logging for the analysis engine.
//!
//! Events go to stderr either as human console lines or as JSONL; stdout is
//! left to rendered reports. Every pipeline event carries the run ID and the
//! stage that emitted it.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, LogEvent, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Install the global subscriber described by `config`.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// is kept.
pub fn init_logging(config: &LogConfig) -> bool {
    let output = match config.format {
        LogFormat::Human => {
            let human = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                human.boxed()
            } else {
                human.without_time().boxed()
            }
        }
        LogFormat::Jsonl => JsonlLayer::stderr().boxed(),
    };
    tracing_subscriber::registry()
        .with(output.with_filter(config.env_filter()))
        .try_init()
        .is_ok()
}

/// Install a subscriber configured from the environment alone.
pub fn init_default_logging() -> bool {
    init_logging(&LogConfig::from_env(None, None))
}

/// Emit a pipeline event tagged with the run ID of a [`LogContext`] and a
/// [`Stage`].
///
/// The level is one of `TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`; the event
/// name becomes the tracing target.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::SCORE_FINISHED, Stage::Score, "scored signals",
///     signals = 412u64);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, $level:ident, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)* $(,)?) => {
        tracing::event!(
            target: $event,
            tracing::Level::$level,
            run_id = %$ctx.run_id,
            stage = %$stage,
            $($key = $val,)*
            message = $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_first_subscriber() {
        let config = LogConfig::default().with_level(LogLevel::Off);
        init_logging(&config);
        assert!(!init_logging(&config.clone().with_format(LogFormat::Jsonl)));
    }

    #[test]
    fn log_event_macro_accepts_every_level() {
        let ctx = LogContext::new("run-macro");
        log_event!(ctx, TRACE, "test.trace", Stage::Init, "trace");
        log_event!(ctx, DEBUG, "test.debug", Stage::Score, "debug", n = 1u64);
        log_event!(ctx, INFO, "test.info", Stage::Test, "info", p = 0.5, ok = true);
        log_event!(ctx, WARN, "test.warn", Stage::Audit, "warn");
        log_event!(ctx, ERROR, "test.error", Stage::Recommend, "error",);
    }
}
