//! Process-wide structured logger façade (component C1).
//!
//! Every call writes through `tracing` (the swappable provider — callers
//! pick a subscriber at boot) and fans out to any registered [`LogSink`]s.
//! Unlike the storage substrate (§4.1), the logger has a default provider:
//! reads before `init_tracing` still work, they just use whatever
//! subscriber (if any) the process installed.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A single structured log line, as observed by registered sinks.
///
/// `Deserialize` lets the hook bus (C3) round-trip a `LogEntry` through an
/// envelope the same way any other typed event does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level_name: &'static str,
    pub message: String,
    pub fields: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

/// An observer of every emitted log entry.
///
/// The hook bus (component C3) implements this to turn log lines into
/// `LogEntryCreated` events — the one sanctioned cross-layer integration
/// point (§4.4). The logger itself has no dependency on the hook bus;
/// wiring happens at engine start-up via [`add_sink`].
pub trait LogSink: Send + Sync {
    fn on_log(&self, entry: &LogEntry);
}

struct Logger {
    sinks: RwLock<Vec<Arc<dyn LogSink>>>,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger {
        sinks: RwLock::new(Vec::new()),
    })
}

/// Install the process's `tracing` subscriber.
///
/// `json` selects the structured JSON writer over the human-readable one —
/// the two swappable back-ends this façade ships with.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

/// Register an additional sink (fan-out writer pipe, §4.1 "singleton").
pub fn add_sink(sink: Arc<dyn LogSink>) {
    logger().sinks.write().expect("logger lock poisoned").push(sink);
}

/// Test-only: removes every registered sink.
pub fn reset_sinks() {
    logger().sinks.write().expect("logger lock poisoned").clear();
}

fn emit(level: Level, message: String, fields: HashMap<String, Value>) {
    match level {
        Level::Trace => tracing::trace!(fields = ?fields, "{message}"),
        Level::Debug => tracing::debug!(fields = ?fields, "{message}"),
        Level::Info => tracing::info!(fields = ?fields, "{message}"),
        Level::Warn => tracing::warn!(fields = ?fields, "{message}"),
        Level::Error => tracing::error!(fields = ?fields, "{message}"),
    }

    let entry = LogEntry {
        level_name: level_name(level),
        message,
        fields,
        timestamp: Utc::now(),
    };
    for sink in logger().sinks.read().expect("logger lock poisoned").iter() {
        sink.on_log(&entry);
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::Trace => "trace",
        Level::Debug => "debug",
        Level::Info => "info",
        Level::Warn => "warn",
        Level::Error => "error",
    }
}

/// Builder for one log line with typed fields.
///
/// ```ignore
/// zbz_core::log::info("request handled")
///     .field("status", 200)
///     .field("path", "/user/42")
///     .emit();
/// ```
pub struct LogBuilder {
    level: Level,
    message: String,
    fields: HashMap<String, Value>,
}

impl LogBuilder {
    fn new(level: Level, message: impl Into<String>) -> Self {
        LogBuilder {
            level,
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.fields
            .insert(key.into(), serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    pub fn emit(self) {
        emit(self.level, self.message, self.fields);
    }
}

pub fn trace(message: impl Into<String>) -> LogBuilder {
    LogBuilder::new(Level::Trace, message)
}

pub fn debug(message: impl Into<String>) -> LogBuilder {
    LogBuilder::new(Level::Debug, message)
}

pub fn info(message: impl Into<String>) -> LogBuilder {
    LogBuilder::new(Level::Info, message)
}

pub fn warn(message: impl Into<String>) -> LogBuilder {
    LogBuilder::new(Level::Warn, message)
}

pub fn error(message: impl Into<String>) -> LogBuilder {
    LogBuilder::new(Level::Error, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(Arc<AtomicUsize>);

    impl LogSink for CountingSink {
        fn on_log(&self, _entry: &LogEntry) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sinks_observe_every_emitted_entry() {
        reset_sinks();
        let count = Arc::new(AtomicUsize::new(0));
        add_sink(Arc::new(CountingSink(count.clone())));

        info("first").emit();
        info("second").field("k", "v").emit();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        reset_sinks();
    }

    #[test]
    fn reset_sinks_stops_delivery() {
        reset_sinks();
        let count = Arc::new(AtomicUsize::new(0));
        add_sink(Arc::new(CountingSink(count.clone())));
        reset_sinks();

        info("should not count").emit();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
