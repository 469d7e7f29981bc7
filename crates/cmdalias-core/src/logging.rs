//! In-memory capture of `tracing` events.
//!
//! [`LogCollector`] is a subscriber layer that keeps the most recent events
//! in a bounded queue. The CLI uses it to print engine diagnostics after an
//! interactive run, and tests use it to assert on emitted warnings.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// A captured event.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Seconds since the collector was created.
    pub elapsed_secs: f64,
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Structured fields other than `message`, rendered as `key=value`.
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Value of a structured field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5} {}", self.level.as_str(), self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    start_time: Instant,
}

impl LogBuffer {
    fn push(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

/// A `tracing` layer that records events at or above a minimum level.
#[derive(Debug, Clone)]
pub struct LogCollector {
    buffer: Arc<Mutex<LogBuffer>>,
    min_level: Level,
}

impl LogCollector {
    /// Collector keeping at most `capacity` entries of every level.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                start_time: Instant::now(),
            })),
            min_level: Level::TRACE,
        }
    }

    /// Ignore events less severe than `level`.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn reader(&self) -> LogReader {
        LogReader {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Level ordering: TRACE > DEBUG > ... > ERROR
        if *metadata.level() > self.min_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        if let Ok(mut buf) = self.buffer.lock() {
            let entry = LogEntry {
                elapsed_secs: buf.start_time.elapsed().as_secs_f64(),
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message: visitor.message,
                fields: visitor.fields,
            };
            buf.push(entry);
        }
    }
}

/// Read handle onto a collector's buffer.
#[derive(Debug, Clone)]
pub struct LogReader {
    buffer: Arc<Mutex<LogBuffer>>,
}

impl LogReader {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Captured `WARN` and `ERROR` entries.
    pub fn warnings(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level <= Level::WARN)
            .collect()
    }

    /// Whether any captured message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let mut rendered = String::new();
        let _ = write!(rendered, "{value:?}");
        self.record(field, rendered);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    #[test]
    fn test_collector_captures_message_and_fields() {
        let collector = LogCollector::new(16);
        let reader = collector.reader();
        let _guard = tracing_subscriber::registry().with(collector).set_default();

        tracing::info!(alias = "hi", dispatched = 2, "Alias expanded");

        let entries = reader.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::INFO);
        assert_eq!(entries[0].message, "Alias expanded");
        assert_eq!(entries[0].field("alias"), Some("hi"));
        assert_eq!(entries[0].field("dispatched"), Some("2"));
        assert_eq!(entries[0].to_string(), " INFO Alias expanded alias=hi dispatched=2");
    }

    #[test]
    fn test_collector_drops_oldest() {
        let collector = LogCollector::new(2);
        let reader = collector.reader();
        let _guard = tracing_subscriber::registry().with(collector).set_default();

        tracing::info!("one");
        tracing::info!("two");
        tracing::info!("three");

        let messages: Vec<String> = reader.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_min_level_and_warnings() {
        let collector = LogCollector::new(16).with_min_level(Level::INFO);
        let reader = collector.reader();
        let _guard = tracing_subscriber::registry().with(collector).set_default();

        tracing::debug!("hidden");
        tracing::info!("shown");
        tracing::warn!("careful");
        tracing::error!("broken");

        assert_eq!(reader.len(), 3);
        assert!(!reader.contains("hidden"));
        let warnings: Vec<String> = reader.warnings().into_iter().map(|e| e.message).collect();
        assert_eq!(warnings, vec!["careful", "broken"]);

        reader.clear();
        assert!(reader.is_empty());
    }
}
