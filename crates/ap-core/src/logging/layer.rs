//! JSONL tracing layer.
//!
//! One JSON object per event on the configured writer (stderr in practice).
//! Correlation fields (`run_id`, `host_id`, `stage`, `package`) are lifted
//! to the top level, taken from the event first and then from enclosing
//! spans; everything else is nested under `fields`.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const CORRELATION_KEYS: [&str; 4] = ["run_id", "host_id", "stage", "package"];

/// Correlation values recorded on a span.
#[derive(Debug, Default)]
struct SpanFields(Map<String, Value>);

/// Collects tracing fields as JSON values.
#[derive(Default)]
struct FieldCollector(Map<String, Value>);

impl FieldCollector {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::from(format!("{value:?}")));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::from(value));
    }
}

pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
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
        let mut collected = FieldCollector::default();
        attrs.record(&mut collected);
        collected.0.retain(|k, _| CORRELATION_KEYS.contains(&k.as_str()));

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(collected.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut collected = FieldCollector::default();
        event.record(&mut collected);
        let mut fields = collected.0;

        let mut line = Map::new();
        line.insert("ts".into(), Value::from(Utc::now().to_rfc3339()));
        line.insert(
            "level".into(),
            Value::from(event.metadata().level().as_str().to_ascii_lowercase()),
        );
        line.insert("event".into(), Value::from(event.metadata().target()));

        for key in CORRELATION_KEYS {
            if let Some(value) = fields.remove(key) {
                line.insert(key.into(), value);
            }
        }
        // Innermost span first, so the closest value wins.
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(SpanFields(inherited)) = span.extensions().get::<SpanFields>() {
                    for (key, value) in inherited {
                        line.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        if let Some(message) = fields.remove("message") {
            line.insert("message".into(), message);
        }
        if !fields.is_empty() {
            line.insert("fields".into(), Value::Object(fields));
        }

        if let Ok(json) = serde_json::to_string(&line) {
            if let Ok(mut writer) = self.writer.lock() {
                let _ = writeln!(writer, "{json}");
            }
        }
    }
}
