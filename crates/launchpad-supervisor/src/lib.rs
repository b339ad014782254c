//! # Launchpad Supervisor
//!
//! Owns the lifecycle of the one external process a launcher button starts.
//!
//! This crate provides:
//! - [`ProcessSupervisor`] - `toggle()` / `shutdown()` over a single task
//! - The monitoring routine that launches, watches and cleans up a run
//! - [`LabelSink`] - the caller's view of button label changes
//! - Loaders for the task descriptor and the launcher configuration

pub mod config;
pub mod label;
pub mod options;
pub mod state;
pub mod supervisor;

mod monitor;


// Re-export main types
pub use config::{
    load_app_config, load_task_descriptor, AppConfig, StartPosition, APP_CONFIG_FILE, TASK_FILE,
};
pub use label::{LabelSink, NoLabels, STOPPING_LABEL};
pub use options::{ExitedStopPolicy, SupervisorOptions};
pub use state::SupervisorState;
pub use supervisor::{ProcessSupervisor, SupervisorBuilder};
