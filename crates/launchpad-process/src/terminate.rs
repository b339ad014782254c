//! Process tree termination.
//!
//! [`ProcessTerminator`] owns the caller-facing contract: non-positive pids
//! are ignored, the kill is bounded by a timeout and the outcome is logged to
//! the event sink, never raised. The kill mechanism itself is a
//! [`TreeKill`] strategy so it can be swapped per platform or in tests.

use async_trait::async_trait;
use launchpad_log::EventSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default upper bound for one termination attempt.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder replaced by the target pid in [`KillCommand`] arguments.
pub const PID_PLACEHOLDER: &str = "{pid}";

/// Raw result of one kill attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl KillOutput {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Outcome reported to the caller of [`ProcessTerminator::terminate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationReport {
    pub success: bool,
    pub diagnostic: String,
}

impl TerminationReport {
    fn skipped() -> Self {
        Self {
            success: false,
            diagnostic: String::new(),
        }
    }
}

/// Mechanism that kills a process and all of its descendants.
#[async_trait]
pub trait TreeKill: Send + Sync {
    async fn kill_tree(&self, pid: i32) -> KillOutput;
}

/// Kills a process tree by running an external tool.
///
/// Every argument equal to or containing `{pid}` has it replaced with the
/// target pid. The tool's stdout and stderr are captured as diagnostics. If
/// the surrounding timeout expires the tool itself is killed.
#[derive(Debug, Clone)]
pub struct KillCommand {
    program: String,
    args: Vec<String>,
}

impl KillCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `taskkill /PID <pid> /T /F`
    pub fn taskkill() -> Self {
        Self::new("taskkill", ["/PID", PID_PLACEHOLDER, "/T", "/F"])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn args_for(&self, pid: i32) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace(PID_PLACEHOLDER, &pid.to_string()))
            .collect()
    }
}

#[async_trait]
impl TreeKill for KillCommand {
    async fn kill_tree(&self, pid: i32) -> KillOutput {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(pid))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        debug!(program = %self.program, pid, "running kill tool");
        match cmd.output().await {
            Ok(output) => KillOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: if output.status.success() || !output.stderr.is_empty() {
                    String::from_utf8_lossy(&output.stderr).trim().to_string()
                } else {
                    format!("{} exited with {}", self.program, output.status)
                },
            },
            Err(e) => KillOutput::failed(format!("failed to run {}: {}", self.program, e)),
        }
    }
}

/// The platform's own tree kill.
///
/// Windows delegates to `taskkill /T /F`. Unix sends `SIGKILL` to the
/// process group led by `pid` (children are spawned as group leaders), and
/// falls back to the single process when no such group exists.
#[derive(Debug, Clone, Default)]
pub struct PlatformTreeKill;

#[async_trait]
impl TreeKill for PlatformTreeKill {
    async fn kill_tree(&self, pid: i32) -> KillOutput {
        #[cfg(unix)]
        {
            kill_group_unix(pid)
        }

        #[cfg(windows)]
        {
            KillCommand::taskkill().kill_tree(pid).await
        }
    }
}

#[cfg(unix)]
fn kill_group_unix(pid: i32) -> KillOutput {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let target = Pid::from_raw(pid);
    match killpg(target, Signal::SIGKILL) {
        Ok(()) => KillOutput::succeeded(format!("SIGKILL sent to process group {}", pid)),
        Err(Errno::ESRCH) => match kill(target, Signal::SIGKILL) {
            Ok(()) => KillOutput::succeeded(format!("SIGKILL sent to process {}", pid)),
            Err(e) => KillOutput::failed(format!("kill {} failed: {}", pid, e)),
        },
        Err(e) => KillOutput::failed(format!("killpg {} failed: {}", pid, e)),
    }
}

/// Forcibly terminates a process tree, best effort.
#[derive(Clone)]
pub struct ProcessTerminator {
    strategy: Arc<dyn TreeKill>,
    timeout: Duration,
    sink: Arc<dyn EventSink>,
}

impl ProcessTerminator {
    /// Terminator using the platform tree kill and the default timeout.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_strategy(Arc::new(PlatformTreeKill), sink)
    }

    pub fn with_strategy(strategy: Arc<dyn TreeKill>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            strategy,
            timeout: DEFAULT_TERMINATE_TIMEOUT,
            sink,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Kill `pid` and all of its descendants.
    ///
    /// Returns immediately without logging when `pid <= 0`. Success is logged
    /// at INFO with the kill tool's output; failure or timeout at WARN. The
    /// result is informational only: callers continue their own cleanup
    /// either way.
    pub async fn terminate(&self, pid: i32) -> TerminationReport {
        if pid <= 0 {
            return TerminationReport::skipped();
        }

        let report = match tokio::time::timeout(self.timeout, self.strategy.kill_tree(pid)).await {
            Ok(output) if output.success => TerminationReport {
                success: true,
                diagnostic: output.stdout,
            },
            Ok(output) => TerminationReport {
                success: false,
                diagnostic: if output.stderr.is_empty() {
                    output.stdout
                } else {
                    output.stderr
                },
            },
            Err(_) => TerminationReport {
                success: false,
                diagnostic: format!(
                    "process tree {} not terminated within {}ms",
                    pid,
                    self.timeout.as_millis()
                ),
            },
        };

        if report.success {
            self.sink
                .info(&format!("process tree terminated:\n{}", report.diagnostic));
        } else {
            warn!(pid, diagnostic = %report.diagnostic, "process tree termination failed");
            self.sink.warn(&format!(
                "warning while terminating process tree: {}",
                report.diagnostic
            ));
        }
        report
    }
}

impl std::fmt::Debug for ProcessTerminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessTerminator")
            .field("timeout", &self.timeout)
            .finish()
    }
}
