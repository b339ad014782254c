//! # Launchpad Process
//!
//! Low-level process operations for the launcher.
//!
//! This crate provides cross-platform primitives for:
//! - Spawning the task's child with captured output
//! - Process existence checks
//! - Forced termination of a whole process tree

pub mod check;
pub mod execute;
pub mod terminate;

// Re-export main types
pub use check::*;
pub use execute::*;
pub use terminate::*;
