//! ProcessSupervisor - start-or-stop control over one external task
//!
//! The supervisor is a cheap, cloneable handle. All mutable state lives in a
//! single [`Slot`] behind a mutex: `toggle()` takes the lock once, decides
//! and performs the transition, and releases it. Heavy work (spawning,
//! polling, killing) happens on a tokio task per run, so callers on a UI
//! thread never block. Label changes are queued under the lock and
//! delivered by their own thread after it is released.
//!
//! ```text
//! Idle --toggle()--> Running --toggle()--> Stopping --cleanup--> Idle
//! Running --child exits--> Idle
//! ```

use crate::label::{LabelQueue, LabelSink, NoLabels, STOPPING_LABEL};
use crate::monitor;
use crate::options::{ExitedStopPolicy, SupervisorOptions};
use crate::state::{RunId, Slot, SupervisorState};
use launchpad_common::{LaunchError, LaunchResult, TaskDescriptor};
use launchpad_log::{EventSink, TracingEventSink};
use launchpad_process::ProcessTerminator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shared state between the handle and the monitoring routines.
pub(crate) struct Inner {
    pub(crate) task: TaskDescriptor,
    pub(crate) options: SupervisorOptions,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) terminator: ProcessTerminator,
    labels: LabelQueue,
    runtime: Handle,
    slot: Mutex<Slot>,
    state_tx: watch::Sender<SupervisorState>,
    next_run: AtomicU64,
}

/// Supervises at most one run of a [`TaskDescriptor`] at a time.
#[derive(Clone)]
pub struct ProcessSupervisor {
    inner: Arc<Inner>,
}

/// Builder for [`ProcessSupervisor`].
pub struct SupervisorBuilder {
    task: TaskDescriptor,
    options: SupervisorOptions,
    sink: Option<Arc<dyn EventSink>>,
    labels: Arc<dyn LabelSink>,
    terminator: Option<ProcessTerminator>,
    runtime: Option<Handle>,
}

impl SupervisorBuilder {
    /// Event sink for the product log. Defaults to [`TracingEventSink`].
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn labels(mut self, labels: Arc<dyn LabelSink>) -> Self {
        self.labels = labels;
        self
    }

    pub fn options(mut self, options: SupervisorOptions) -> Self {
        self.options = options;
        self
    }

    /// Terminator used on cancellation. Defaults to the platform tree kill
    /// bounded by `options.terminate_timeout`.
    pub fn terminator(mut self, terminator: ProcessTerminator) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Runtime the monitoring routines run on. Defaults to the runtime the
    /// builder is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> LaunchResult<ProcessSupervisor> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                LaunchError::configuration("runtime", format!("no tokio runtime available: {}", e))
            })?,
        };
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingEventSink));
        let terminator = self.terminator.unwrap_or_else(|| {
            ProcessTerminator::new(sink.clone()).with_timeout(self.options.terminate_timeout)
        });
        let labels = LabelQueue::spawn(self.labels)?;
        let (state_tx, _) = watch::channel(SupervisorState::Idle);

        Ok(ProcessSupervisor {
            inner: Arc::new(Inner {
                task: self.task,
                options: self.options,
                sink,
                terminator,
                labels,
                runtime,
                slot: Mutex::new(Slot::Idle),
                state_tx,
                next_run: AtomicU64::new(1),
            }),
        })
    }
}

impl ProcessSupervisor {
    pub fn builder(task: TaskDescriptor) -> SupervisorBuilder {
        SupervisorBuilder {
            task,
            options: SupervisorOptions::default(),
            sink: None,
            labels: Arc::new(NoLabels),
            terminator: None,
            runtime: None,
        }
    }

    pub fn task(&self) -> &TaskDescriptor {
        &self.inner.task
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.inner.options
    }

    pub fn state(&self) -> SupervisorState {
        self.inner.slot.lock().state()
    }

    /// Pid of the active child, once it has been spawned.
    pub fn current_pid(&self) -> Option<i32> {
        self.inner.slot.lock().pid()
    }

    /// Start a run when idle, otherwise request the active run to stop.
    ///
    /// Never blocks. Returns `false` when a run was started and `true` when
    /// the call was treated as a stop request, including repeated requests
    /// while a stop is already in flight (those have no further effect).
    pub fn toggle(&self) -> bool {
        let mut slot = self.inner.slot.lock();
        match slot.state() {
            SupervisorState::Idle => {
                let (run, cancel) = self.inner.start_locked(&mut slot);
                drop(slot);
                // May release the run on the spot when the runtime is gone,
                // which takes the lock again
                monitor::launch(Arc::clone(&self.inner), &self.inner.runtime, run, cancel);
                false
            }
            SupervisorState::Running => {
                self.inner.request_stop_locked(&mut slot, true);
                true
            }
            SupervisorState::Stopping => {
                self.inner.sink.info(&format!(
                    "task is already stopping, ignoring repeated request:{}",
                    format_pid(slot.pid())
                ));
                true
            }
        }
    }

    /// Stop the active run and wait until the supervisor is idle.
    ///
    /// Meant for application teardown: no "stopping" label is emitted, and
    /// the wait is bounded by `options.shutdown_timeout`. Returns whether a
    /// run was active when called.
    pub async fn shutdown(&self) -> bool {
        let requested = {
            let mut slot = self.inner.slot.lock();
            let state = slot.state();
            if state == SupervisorState::Running {
                self.inner.request_stop_locked(&mut slot, false);
            }
            state.is_active()
        };

        if requested && !self.wait_until_idle(self.inner.options.shutdown_timeout).await {
            self.inner.sink.warn(&format!(
                "task did not stop within {}ms of shutdown",
                self.inner.options.shutdown_timeout.as_millis()
            ));
        }
        requested
    }

    /// Wait until the supervisor reports `Idle`. Returns `false` on timeout.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let mut rx = self.inner.state_tx.subscribe();
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| *s == SupervisorState::Idle)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Wait until every label change made so far has reached the
    /// [`LabelSink`]. Returns `false` on timeout.
    pub async fn flush_labels(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.inner.labels.flush())
            .await
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("task", &self.inner.task)
            .field("state", &self.state())
            .finish()
    }
}

impl Inner {
    /// Step 1 of a run: enter `Running` and show the stop label. The caller
    /// launches the routine once the lock is released.
    fn start_locked(&self, slot: &mut Slot) -> (RunId, CancellationToken) {
        let run = self.next_run.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();

        self.replace_slot(
            slot,
            Slot::Running {
                run,
                pid: None,
                cancel: cancel.clone(),
                exited: false,
            },
        );
        self.labels.push(&self.task.running_label());
        self.sink.info("task state set to running");

        (run, cancel)
    }

    fn replace_slot(&self, slot: &mut Slot, next: Slot) {
        let from = slot.state();
        let to = next.state();
        debug_assert!(
            from.can_transition_to(to),
            "invalid supervisor transition {} -> {}",
            from,
            to
        );
        debug!(from = %from, to = %to, run = ?next.run_id().or(slot.run_id()), "supervisor transition");
        *slot = next;
        self.state_tx.send_replace(to);
    }

    /// Stop branch shared by `toggle()` and `shutdown()`. Caller holds the
    /// lock and has checked the slot is `Running`.
    ///
    /// The kill itself is performed by the run's monitoring routine when it
    /// observes the cancelled token, so a run is terminated at most once no
    /// matter how many stop requests arrive.
    fn request_stop_locked(&self, slot: &mut Slot, show_stopping: bool) {
        let (run, pid, cancel, exited) = match &*slot {
            Slot::Running {
                run,
                pid,
                cancel,
                exited,
            } => (*run, *pid, cancel.clone(), *exited),
            _ => return,
        };

        if show_stopping {
            self.labels.push(STOPPING_LABEL);
        }

        if exited && self.options.exited_stop_policy == ExitedStopPolicy::ResetImmediately {
            self.replace_slot(slot, Slot::Idle);
            self.labels.push(self.task.display_name());
            self.sink.info(&format!(
                "process already exited, task state reset:{}",
                format_pid(pid)
            ));
        } else {
            self.replace_slot(slot, Slot::Stopping { run, pid });
            if exited {
                self.sink.info(&format!(
                    "process already exited, waiting for cleanup:{}",
                    format_pid(pid)
                ));
            } else {
                self.sink
                    .info(&format!("stopping background process..{}", format_pid(pid)));
            }
        }
        cancel.cancel();
    }

    /// Record the child's pid once spawned.
    pub(crate) fn attach_pid(&self, run: RunId, child_pid: i32) {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Running { run: r, pid, .. } | Slot::Stopping { run: r, pid } if *r == run => {
                *pid = Some(child_pid);
            }
            _ => {}
        }
    }

    /// Record that the child has exited on its own.
    pub(crate) fn mark_exited(&self, run: RunId) {
        let mut slot = self.slot.lock();
        if let Slot::Running { run: r, exited, .. } = &mut *slot {
            if *r == run {
                *exited = true;
            }
        }
    }

    /// Terminal cleanup of a run: back to `Idle` and the idle label.
    ///
    /// Leaves the slot alone when it no longer belongs to `run`, which
    /// happens when a stop request already reset it.
    pub(crate) fn finish_run(&self, run: RunId) {
        let mut slot = self.slot.lock();
        if slot.run_id() == Some(run) {
            self.replace_slot(&mut slot, Slot::Idle);
            self.labels.push(self.task.display_name());
            self.sink.info("task state reset");
        } else {
            debug!(run, "run already released");
        }
        drop(slot);
        self.sink.info("task finished");
    }
}

pub(crate) fn format_pid(pid: Option<i32>) -> String {
    pid.map(|p| p.to_string()).unwrap_or_default()
}
