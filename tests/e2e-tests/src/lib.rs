//! E2E test framework for launchpad
//!
//! Scenarios drive a real [`ProcessSupervisor`] whose task is the `testexe`
//! binary. Build it first (`cargo build -p testexe`); a workspace-wide
//! `cargo test` builds it as part of its own integration tests.

use launchpad_common::TaskDescriptor;
use launchpad_log::{BufferEventSink, LogLevel};
use launchpad_supervisor::{ProcessSupervisor, SupervisorOptions};
use parking_lot::Mutex;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Get the path to the TESTEXE (testexe) binary
pub fn get_testexe_path() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }

    path.push(format!("testexe{}", env::consts::EXE_SUFFIX));

    if !path.exists() {
        panic!(
            "TESTEXE binary not found at: {} (run `cargo build -p testexe`)",
            path.display()
        );
    }

    path
}

/// Quote a path for an argument string.
pub fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

/// A supervisor wired to a recording sink and label list, running testexe
/// with the given arguments from a private temporary directory.
pub struct TestExecutor {
    pub test_dir: TempDir,
    pub supervisor: ProcessSupervisor,
    pub sink: Arc<BufferEventSink>,
    labels: Arc<Mutex<Vec<String>>>,
}

impl TestExecutor {
    pub fn new(name: &str, testexe_args: &str) -> Self {
        Self::with_options(name, testexe_args, SupervisorOptions::default())
    }

    pub fn with_options(name: &str, testexe_args: &str, options: SupervisorOptions) -> Self {
        Self::build(name, |_| testexe_args.to_string(), options)
    }

    /// Like [`TestExecutor::new`], with arguments that refer to files in the
    /// test directory.
    pub fn in_test_dir(name: &str, testexe_args: impl FnOnce(&Path) -> String) -> Self {
        Self::build(name, testexe_args, SupervisorOptions::default())
    }

    fn build(
        name: &str,
        testexe_args: impl FnOnce(&Path) -> String,
        options: SupervisorOptions,
    ) -> Self {
        let test_dir = TempDir::new().expect("Failed to create test directory");
        let testexe = get_testexe_path();
        let task = TaskDescriptor::new(
            name,
            testexe.to_string_lossy(),
            testexe_args(test_dir.path()),
        );

        println!("=== Test Executor Setup ===");
        println!("Task: {}", task);
        println!("Test dir: {}", test_dir.path().display());
        println!("===========================\n");

        let sink = Arc::new(BufferEventSink::new(10_000));
        let labels = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&labels);
        let supervisor = ProcessSupervisor::builder(task)
            .sink(sink.clone())
            .labels(Arc::new(move |label: &str| recorded.lock().push(label.to_string())))
            .options(options)
            .build()
            .expect("Failed to build supervisor");

        Self {
            test_dir,
            supervisor,
            sink,
            labels,
        }
    }

    /// Path inside the test directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.test_dir.path().join(name)
    }

    /// Labels delivered so far, after waiting for queued ones.
    pub async fn labels(&self) -> Vec<String> {
        assert!(
            self.supervisor.flush_labels(Duration::from_secs(2)).await,
            "label delivery stalled"
        );
        self.labels.lock().clone()
    }

    /// Messages written at `level`, oldest first.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.sink
            .records()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }

    pub async fn wait_for_pid(&self, timeout: Duration) -> Result<i32, String> {
        wait_until(timeout, || self.supervisor.current_pid().is_some()).await?;
        self.supervisor
            .current_pid()
            .ok_or_else(|| "pid vanished".to_string())
    }
}

/// Poll `predicate` every 10ms until it holds or `timeout` expires.
pub async fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> Result<(), String> {
    let deadline = tokio::time::Instant::now() + timeout;
    while !predicate() {
        if tokio::time::Instant::now() >= deadline {
            return Err(format!("condition not reached within {:?}", timeout));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Wait for a pid file to appear and parse it.
pub async fn wait_for_pid_file(path: &Path, timeout: Duration) -> Result<i32, String> {
    wait_until(timeout, || read_pid_file(path).is_some()).await?;
    read_pid_file(path).ok_or_else(|| format!("unreadable pid file {}", path.display()))
}

pub fn read_pid_file(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// True when `pid` is a live process. Zombies count as gone: a killed
/// grandchild may linger unreaped when init does not collect it.
pub fn is_alive(pid: i32) -> bool {
    if !launchpad_process::process_exists(pid).unwrap_or(false) {
        return false;
    }

    #[cfg(target_os = "linux")]
    {
        // Field 3 of /proc/<pid>/stat is the state; it follows the ")" of the name
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            if let Some(rest) = stat.rsplit(')').next() {
                return rest.trim_start().chars().next() != Some('Z');
            }
        }
    }

    true
}
