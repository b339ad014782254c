//! Tuning knobs of the supervisor.

use launchpad_process::DEFAULT_TERMINATE_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a stop request does when the child has already exited but the
/// monitoring routine has not finished its cleanup yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitedStopPolicy {
    /// Enter `Stopping` and let the routine's own cleanup reach `Idle`.
    #[default]
    AwaitCleanup,
    /// Return to `Idle` immediately; the routine's cleanup leaves the
    /// state alone.
    ResetImmediately,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// Interval between liveness checks; bounds cancellation latency.
    pub poll_interval: Duration,
    /// Upper bound for one process-tree termination.
    pub terminate_timeout: Duration,
    /// How long output readers may keep draining after the child is gone.
    pub output_drain_timeout: Duration,
    /// How long `shutdown()` waits for the run to reach `Idle`.
    pub shutdown_timeout: Duration,
    pub exited_stop_policy: ExitedStopPolicy,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
            output_drain_timeout: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(10),
            exited_stop_policy: ExitedStopPolicy::AwaitCleanup,
        }
    }
}
