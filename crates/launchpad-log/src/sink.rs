//! The leveled sink interface and the sinks that wrap other sinks.

use crate::types::LogLevel;
use std::sync::Arc;

/// Destination for the launcher's leveled events.
///
/// Implementations must tolerate concurrent writers: the supervisor writes
/// from the caller's thread, the monitoring routine and the stream readers.
/// A sink never reports failure back to the writer.
pub trait EventSink: Send + Sync {
    /// Write one event.
    fn write(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.write(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, message);
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn write(&self, level: LogLevel, message: &str) {
        (**self).write(level, message);
    }
}

/// Forwards events to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "launchpad::events", "{}", message),
            LogLevel::Info => tracing::info!(target: "launchpad::events", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "launchpad::events", "{}", message),
            LogLevel::Error => tracing::error!(target: "launchpad::events", "{}", message),
        }
    }
}

/// Writes every event to each of its sinks, in order.
#[derive(Default, Clone)]
pub struct MultiEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl MultiEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for MultiEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiEventSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventSink for MultiEventSink {
    fn write(&self, level: LogLevel, message: &str) {
        for sink in &self.sinks {
            sink.write(level, message);
        }
    }
}
