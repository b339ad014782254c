//! Supervisor state and the slot it is derived from.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Identifies one run so a finishing routine never releases a newer run.
pub(crate) type RunId = u64;

/// Externally visible supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisorState {
    /// No child; the next toggle starts a run
    Idle,
    /// A run is active and has not been asked to stop
    Running,
    /// A stop was requested; waiting for the run's cleanup
    Stopping,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Idle => write!(f, "idle"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::Stopping => write!(f, "stopping"),
        }
    }
}

impl SupervisorState {
    /// Check if a run is attached
    pub fn is_active(&self) -> bool {
        !matches!(self, SupervisorState::Idle)
    }

    /// Check if a transition from this state to `target` is allowed
    pub fn can_transition_to(&self, target: SupervisorState) -> bool {
        matches!(
            (self, target),
            (SupervisorState::Idle, SupervisorState::Running)
                | (SupervisorState::Running, SupervisorState::Stopping)
                | (SupervisorState::Running, SupervisorState::Idle)
                | (SupervisorState::Stopping, SupervisorState::Idle)
        )
    }
}

/// State, child pid and cancellation token as one value.
///
/// Every transition replaces the whole slot under the supervisor lock, so a
/// toggle never observes a half-updated run.
#[derive(Debug)]
pub(crate) enum Slot {
    Idle,
    Running {
        run: RunId,
        pid: Option<i32>,
        cancel: CancellationToken,
        exited: bool,
    },
    Stopping {
        run: RunId,
        pid: Option<i32>,
    },
}

impl Slot {
    pub(crate) fn state(&self) -> SupervisorState {
        match self {
            Slot::Idle => SupervisorState::Idle,
            Slot::Running { .. } => SupervisorState::Running,
            Slot::Stopping { .. } => SupervisorState::Stopping,
        }
    }

    pub(crate) fn run_id(&self) -> Option<RunId> {
        match self {
            Slot::Idle => None,
            Slot::Running { run, .. } | Slot::Stopping { run, .. } => Some(*run),
        }
    }

    pub(crate) fn pid(&self) -> Option<i32> {
        match self {
            Slot::Idle => None,
            Slot::Running { pid, .. } | Slot::Stopping { pid, .. } => *pid,
        }
    }
}
