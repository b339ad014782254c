//! The monitoring routine: one tokio task per run.
//!
//! The routine owns the child for its whole life: it spawns it, forwards its
//! output, polls for exit or cancellation, kills the tree when cancelled and
//! always finishes with the supervisor's cleanup. Cleanup is tied to a drop
//! guard so it also runs when the routine panics or is never polled.

use crate::state::RunId;
use crate::supervisor::Inner;
use launchpad_common::{LaunchError, LaunchResult};
use launchpad_log::{forward_lines, StreamType};
use launchpad_process::spawn_task;
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::process::Child;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a run ended when it did not fail.
#[derive(Debug)]
enum RunEnd {
    /// The child exited on its own.
    Exited(ExitStatus),
    /// A stop request was honoured; the tree was killed.
    Cancelled,
    /// A stop request arrived before the child was spawned.
    CancelledBeforeSpawn,
}

/// Runs the run's cleanup exactly once, when dropped.
struct CleanupGuard {
    inner: Arc<Inner>,
    run: RunId,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.inner.finish_run(self.run);
    }
}

/// Schedule the routine for `run`, followed by its completion notification.
///
/// Must be called without the slot lock held: if the runtime has shut down
/// the routine is dropped immediately and its guard releases the run.
pub(crate) fn launch(inner: Arc<Inner>, runtime: &Handle, run: RunId, cancel: CancellationToken) {
    let sink = Arc::clone(&inner.sink);
    let cleanup = CleanupGuard {
        inner: Arc::clone(&inner),
        run,
    };
    let routine = runtime.spawn(async move {
        let _cleanup = cleanup;
        run_task(inner, run, cancel).await
    });

    runtime.spawn(async move {
        if let Err(e) = routine.await {
            sink.error(&format!("monitoring routine aborted: {}", e));
        }
        sink.info("task completion callback");
    });
}

async fn run_task(inner: Arc<Inner>, run: RunId, cancel: CancellationToken) {
    match supervise(&inner, run, &cancel).await {
        Ok(RunEnd::Exited(status)) => {
            debug!(run, ?status, "child exited");
        }
        Ok(RunEnd::Cancelled) => {
            inner.sink.info("task was cancelled");
        }
        Ok(RunEnd::CancelledBeforeSpawn) => {
            inner.sink.info("task was cancelled before the process started");
        }
        Err(e) if cancel.is_cancelled() => {
            inner.sink.info(&format!("task was cancelled: {}", e));
        }
        Err(e) => {
            inner.sink.error(&format!("task execution failed: {}", e));
        }
    }
}

async fn supervise(inner: &Arc<Inner>, run: RunId, cancel: &CancellationToken) -> LaunchResult<RunEnd> {
    if cancel.is_cancelled() {
        return Ok(RunEnd::CancelledBeforeSpawn);
    }

    let mut child = spawn_task(&inner.task)?;
    let pid = child.id().and_then(|id| i32::try_from(id).ok()).unwrap_or(0);
    inner.attach_pid(run, pid);
    inner.sink.info(&format!("child process started:{}", pid));

    let reader_cancel = CancellationToken::new();
    let readers = spawn_readers(inner, &mut child, pid, &reader_cancel);

    let result = watch_child(inner, run, cancel, &mut child, pid).await;
    if let Err(e) = &result {
        // The child is not killed on drop, so it must not outlive a failed watch
        inner
            .sink
            .warn(&format!("lost track of process, terminating it:{} ({})", pid, e));
        kill_and_reap(inner, &mut child, pid).await;
    }

    drain_readers(inner, readers, reader_cancel, pid).await;
    result
}

fn spawn_readers(
    inner: &Arc<Inner>,
    child: &mut Child,
    pid: i32,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<u64>> {
    let mut readers = Vec::with_capacity(2);

    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_lines(
            stdout,
            StreamType::Stdout,
            pid,
            Arc::clone(&inner.sink),
            cancel.clone(),
        )));
    }

    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_lines(
            stderr,
            StreamType::Stderr,
            pid,
            Arc::clone(&inner.sink),
            cancel.clone(),
        )));
    }

    readers
}

/// Poll the child until it exits or the run is cancelled.
async fn watch_child(
    inner: &Arc<Inner>,
    run: RunId,
    cancel: &CancellationToken,
    child: &mut Child,
    pid: i32,
) -> LaunchResult<RunEnd> {
    let poll_interval = inner.options.poll_interval;

    loop {
        match tokio::time::timeout(poll_interval, child.wait()).await {
            Ok(Ok(status)) => {
                inner.mark_exited(run);
                inner.sink.info(&format!("process exit detected:{}", pid));
                return Ok(RunEnd::Exited(status));
            }
            Ok(Err(e)) => return Err(LaunchError::monitor(pid, e.to_string())),
            Err(_) => {}
        }

        if cancel.is_cancelled() {
            inner
                .sink
                .info(&format!("cancellation requested, terminating process:{}", pid));
            return terminate_child(inner, child, pid).await;
        }
    }
}

async fn terminate_child(inner: &Arc<Inner>, child: &mut Child, pid: i32) -> LaunchResult<RunEnd> {
    if let Some(status) = child.try_wait()? {
        return Ok(RunEnd::Exited(status));
    }

    inner.sink.info(&format!("terminating process on cancel..{}", pid));
    kill_and_reap(inner, child, pid).await;
    Ok(RunEnd::Cancelled)
}

/// Kill the tree through the terminator, falling back to the direct child,
/// then reap the child so no zombie outlives the run. Never fails; the
/// terminator is called exactly once.
pub(crate) async fn kill_and_reap(inner: &Inner, child: &mut Child, pid: i32) {
    let report = inner.terminator.terminate(pid).await;
    if !report.success {
        warn!(pid, "tree kill failed, killing direct child");
        if let Err(e) = child.start_kill() {
            debug!(pid, error = %e, "direct kill failed");
        }
    }

    match tokio::time::timeout(inner.options.output_drain_timeout, child.wait()).await {
        Ok(Ok(status)) => debug!(pid, ?status, "child reaped after termination"),
        Ok(Err(e)) => warn!(pid, error = %e, "failed to reap child"),
        Err(_) => inner
            .sink
            .warn(&format!("process still running after termination:{}", pid)),
    }
}

/// Let the readers flush what the child wrote before exiting, bounded by
/// the drain timeout, then stop whatever is still reading.
async fn drain_readers(
    inner: &Arc<Inner>,
    readers: Vec<JoinHandle<u64>>,
    cancel: CancellationToken,
    pid: i32,
) {
    let deadline = Instant::now() + inner.options.output_drain_timeout;
    let mut lines = 0u64;

    for mut reader in readers {
        match tokio::time::timeout_at(deadline, &mut reader).await {
            Ok(Ok(count)) => lines += count,
            Ok(Err(e)) => warn!(pid, error = %e, "output reader failed"),
            Err(_) => {
                cancel.cancel();
                if let Ok(count) = reader.await {
                    lines += count;
                }
            }
        }
    }

    debug!(pid, lines, "output readers finished");
}
