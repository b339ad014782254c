//! Error types for the launchpad workspace.
//!
//! Errors never cross the boundary of a supervised run: the supervisor turns
//! them into event-sink entries. They exist so the lower layers (spawning,
//! monitoring, configuration) can still use `Result` and `?` internally.

use thiserror::Error;

/// Result type for launchpad operations.
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

/// Error taxonomy for launching and supervising a single task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// The executable could not be started (missing, permission denied, ...).
    #[error("spawn failed: {executable} - {reason}")]
    SpawnFailed { executable: String, reason: String },

    /// The monitoring routine lost track of the child.
    #[error("monitor error: pid {pid} - {reason}")]
    Monitor { pid: i32, reason: String },

    /// A configuration source could not be used.
    #[error("configuration error: {source_name} - {reason}")]
    Configuration { source_name: String, reason: String },

    /// Wrapped I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl LaunchError {
    pub fn spawn_failed(executable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            executable: executable.into(),
            reason: reason.into(),
        }
    }

    pub fn monitor(pid: i32, reason: impl Into<String>) -> Self {
        Self::Monitor {
            pid,
            reason: reason.into(),
        }
    }

    pub fn configuration(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for LaunchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
