//! Core types for the product log

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Severity of an event written to a sink
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream type (stdout or stderr)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Stdout,
    Stderr,
}

impl StreamType {
    /// Level a line from this stream is logged at.
    pub fn level(&self) -> LogLevel {
        match self {
            StreamType::Stdout => LogLevel::Info,
            StreamType::Stderr => LogLevel::Error,
        }
    }

    /// Prefix tag used in forwarded lines.
    pub fn tag(&self) -> &'static str {
        match self {
            StreamType::Stdout => "Child Stdout",
            StreamType::Stderr => "Child Stderr",
        }
    }
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Stdout => write!(f, "stdout"),
            StreamType::Stderr => write!(f, "stderr"),
        }
    }
}

/// One event as retained by an in-memory sink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}
