//! # Launchpad Log
//!
//! The product log of the launcher.
//!
//! This crate provides:
//! - The leveled [`EventSink`] interface the supervisor reports through
//! - Sinks for a daily log file, `tracing`, an in-memory buffer and fan-out
//! - Line forwarding from a child's stdout/stderr into a sink

pub mod forward;
pub mod output;
pub mod sink;
pub mod types;

// Re-export main types
pub use forward::{forward_lines, MAX_LINE_BYTES};
pub use output::{BufferEventSink, FileEventSink};
pub use sink::{EventSink, MultiEventSink, TracingEventSink};
pub use types::{LogLevel, LogRecord, StreamType};
