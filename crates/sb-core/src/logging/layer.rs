//! Custom tracing layer for JSONL output.
//!
//! Produces one JSON object per event on stderr so that stdout stays free
//! for rendered reports.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::{Level, LogEvent, Stage};

/// Fields lifted out of enclosing spans onto every event.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
    stage: Option<String>,
    signal: Option<String>,
}

impl SpanContext {
    fn set(&mut self, name: &str, value: String) {
        match name {
            "run_id" => self.run_id = Some(value),
            "stage" => self.stage = Some(value),
            "signal" => self.signal = Some(value),
            _ => {}
        }
    }

    fn fill_from(&mut self, outer: &SpanContext) {
        if self.run_id.is_none() {
            self.run_id.clone_from(&outer.run_id);
        }
        if self.stage.is_none() {
            self.stage.clone_from(&outer.stage);
        }
        if self.signal.is_none() {
            self.signal.clone_from(&outer.signal);
        }
    }
}

impl Visit for SpanContext {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.set(field.name(), format!("{:?}", value));
    }
}

/// Collects event fields; context fields are promoted to the top level.
struct JsonFieldVisitor {
    context: SpanContext,
    fields: BTreeMap<String, serde_json::Value>,
    message: Option<String>,
}

impl JsonFieldVisitor {
    fn new() -> Self {
        JsonFieldVisitor {
            context: SpanContext::default(),
            fields: BTreeMap::new(),
            message: None,
        }
    }

    fn record_string(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "run_id" | "stage" | "signal" => self.context.set(field.name(), value),
            name => {
                self.fields
                    .insert(name.to_string(), serde_json::Value::String(value));
            }
        }
    }
}

impl Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_string(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_string(field, format!("{:?}", value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

/// JSONL tracing layer.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut context = SpanContext::default();
        attrs.record(&mut context);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(context);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::new();
        event.record(&mut visitor);

        // Innermost span wins; event fields win over all spans.
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    visitor.context.fill_from(span_ctx);
                }
            }
        }

        let meta = event.metadata();
        let mut line = LogEvent::new(Level::from(*meta.level()), meta.target());
        line.run_id = visitor.context.run_id;
        line.signal = visitor.context.signal;
        line.message = visitor.message;
        line.fields = visitor.fields;
        if let Some(raw) = visitor.context.stage {
            match raw.parse::<Stage>() {
                Ok(stage) => line.stage = Some(stage),
                Err(_) => {
                    line.fields.insert("stage".to_string(), serde_json::Value::String(raw));
                }
            }
        }

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line.to_jsonl());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    struct BufWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for BufWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = JsonlLayer::new(BufWriter(buffer.clone()));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        let output = buffer.lock().unwrap();
        String::from_utf8_lossy(&output).to_string()
    }

    #[test]
    fn test_jsonl_layer_output() {
        let out = capture(|| {
            tracing::info!(target: "test.event", occurrences = 37u64, message = "test message");
        });
        let line: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(line["level"], "info");
        assert_eq!(line["event"], "test.event");
        assert_eq!(line["message"], "test message");
        assert_eq!(line["fields"]["occurrences"], 37);
    }

    #[test]
    fn span_context_is_inherited() {
        let out = capture(|| {
            let run = tracing::info_span!("run", run_id = "run-0123456789ab");
            let _run = run.enter();
            let stage = tracing::info_span!("stage", stage = "audit");
            let _stage = stage.enter();
            tracing::warn!(target: "audit.warning", signal = "header:x-pingback", message = "low support");
        });
        let line: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(line["run_id"], "run-0123456789ab");
        assert_eq!(line["stage"], "audit");
        assert_eq!(line["signal"], "header:x-pingback");
        assert_eq!(line["level"], "warn");
        assert!(line.get("fields").is_none());
    }

    #[test]
    fn unknown_stage_is_kept_as_field() {
        let out = capture(|| {
            tracing::info!(target: "x.y", stage = "warmup", message = "m");
        });
        let event: LogEvent = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(event.stage, None);
        assert_eq!(event.fields["stage"], "warmup");
    }
}
