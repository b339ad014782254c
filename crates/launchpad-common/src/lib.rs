//! # Launchpad Common
//!
//! Types shared by every launchpad crate: the error taxonomy and the
//! immutable description of the task a supervisor launches.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{LaunchError, LaunchResult};
pub use types::{split_arguments, TaskDescriptor};
