use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::reload;
use tracing_subscriber::{EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    pub fn parse(value: &str) -> Option<LogLevel> {
        LogLevel::ALL.into_iter().find(|level| level.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp_secs: u64,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {:5} {} {}",
            self.timestamp_secs, self.level, self.target, self.message
        )
    }
}

/// Capacity-bounded ring buffer the agent exposes over the control channel
/// as a diagnostics snapshot, instead of requiring the operator to shell
/// into the host and tail a file.
#[derive(Debug, Clone)]
pub struct LogStore {
    capacity: usize,
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }
}

pub type ReloadHandle = reload::Handle<EnvFilter, Registry>;

/// Wires a reloadable `EnvFilter` plus an in-memory capture layer into the
/// global subscriber so `apply_log_level` can change verbosity at runtime
/// in response to a server-pushed policy update, without a process restart.
pub fn init_logging(default_level: LogLevel, capacity: usize) -> (LogStore, ReloadHandle) {
    let store = LogStore::new(capacity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));
    let (filter, handle) = reload::Layer::new(filter);

    let capture_layer = LogCaptureLayer {
        store: store.clone(),
    };
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(capture_layer);

    tracing::subscriber::set_global_default(subscriber)
        .expect("global tracing subscriber already set");

    (store, handle)
}

pub fn apply_log_level(handle: &ReloadHandle, level: LogLevel) -> Result<(), reload::Error> {
    handle.modify(|filter| *filter = EnvFilter::new(level.as_str()))
}

struct LogCaptureLayer {
    store: LogStore,
}

impl<S: Subscriber> Layer<S> for LogCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.store.push(LogEntry {
            timestamp_secs: now_epoch_seconds(),
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }
}

fn now_epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_case_insensitive_level_names() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("bogus"), None);
    }

    #[test]
    fn log_store_evicts_oldest_when_full() {
        let store = LogStore::new(2);
        for i in 0..3u64 {
            store.push(LogEntry {
                timestamp_secs: i,
                level: Level::INFO,
                target: "test".to_string(),
                message: format!("entry {i}"),
            });
        }
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].message, "entry 1");
        assert_eq!(snapshot[1].message, "entry 2");
    }
}
