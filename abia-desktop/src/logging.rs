//! Tracing setup.
//!
//! Three sinks share one `EnvFilter`:
//! - stderr, human readable (stdout carries the IPC stream),
//! - `logs/abia.log.YYYY-MM-DD`, rolled daily through a non-blocking writer,
//! - the UI, which receives WARN and ERROR events as `log` events.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::ipc::{EVENT_LOG, EventSink};

pub const LOG_FILE_PREFIX: &str = "abia.log";
const DEFAULT_LEVEL: &str = "info";

/// Payload of a `log` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    pub timestamp: String,
}

/// Forwards WARN and ERROR events to the UI.
pub struct UiLogLayer {
    sink: EventSink,
}

impl UiLogLayer {
    pub fn new(sink: EventSink) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for UiLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Level ordering: ERROR < WARN < INFO
        if *metadata.level() > Level::WARN {
            return;
        }

        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let record = LogRecord {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        if let Ok(payload) = serde_json::to_value(record) {
            self.sink.emit(EVENT_LOG, payload);
        }
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}

/// `--log-level` wins over `RUST_LOG`; `info` otherwise.
fn build_filter(level: Option<&str>) -> anyhow::Result<EnvFilter> {
    match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e)),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))),
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the log file when dropped; keep it alive for
/// the whole process.
pub fn init(level: Option<&str>, logs_dir: &Path, sink: EventSink) -> anyhow::Result<WorkerGuard> {
    let filter = build_filter(level)?;
    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(UiLogLayer::new(sink))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::Outbound;

    #[test]
    fn test_only_warnings_and_errors_are_forwarded() {
        let (sink, mut rx) = EventSink::channel();
        let subscriber = tracing_subscriber::registry().with(UiLogLayer::new(sink));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("[Test] routine");
            tracing::warn!(file = "a.pdf", "[Test] Could not index");
            tracing::error!("[Test] broken");
        });

        let mut records = Vec::new();
        while let Ok(Outbound::Event(event)) = rx.try_recv() {
            assert_eq!(event.event, EVENT_LOG);
            records.push(event.payload);
        }
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], "WARN");
        assert_eq!(records[0]["message"], "[Test] Could not index");
        assert_eq!(records[0]["fields"]["file"], "a.pdf");
        assert_eq!(records[1]["level"], "ERROR");
    }

    #[test]
    fn test_filter_from_level() {
        assert!(build_filter(Some("debug")).is_ok());
        assert!(build_filter(Some("abia_core=trace,warn")).is_ok());
    }
}
