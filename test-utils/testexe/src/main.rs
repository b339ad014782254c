use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;
use tracing::{info, warn};

/// Test executable for launchpad E2E testing
#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Controllable child process for launcher testing", long_about = None)]
struct Args {
    /// Milliseconds to run before exiting (0 = run until killed)
    #[arg(long, default_value = "0")]
    run_duration_ms: u64,

    /// Exit code to return when the run duration elapses
    #[arg(long, default_value = "0")]
    exit_code: i32,

    /// Lines to print on stdout at startup
    #[arg(long, default_value = "0")]
    stdout_lines: usize,

    /// Lines to print on stderr at startup
    #[arg(long, default_value = "0")]
    stderr_lines: usize,

    /// Ignore SIGTERM / Ctrl+C so only a forced kill stops the process
    #[arg(long)]
    ignore_term: bool,

    /// Start a copy of this executable that runs until killed, writing its
    /// pid to `<pid-file>.child`
    #[arg(long, requires = "pid_file")]
    spawn_child: bool,

    /// PID file path to write process ID
    #[arg(long)]
    pid_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr at WARN so they do not mix with the scripted output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    info!("Starting testexe with args: {:?}", args);

    if let Some(path) = &args.pid_file {
        atomic_write_text(path, &std::process::id().to_string())
            .with_context(|| format!("failed to write PID file {}", path.display()))?;
    }

    if args.spawn_child {
        if let Some(path) = &args.pid_file {
            spawn_grandchild(&child_pid_file(path))?;
        }
    }

    print_lines(args.stdout_lines, args.stderr_lines)?;

    if args.ignore_term {
        ignore_termination();
    }

    if args.run_duration_ms == 0 {
        std::future::pending::<()>().await;
    }
    sleep(Duration::from_millis(args.run_duration_ms)).await;

    std::process::exit(args.exit_code);
}

fn print_lines(stdout_lines: usize, stderr_lines: usize) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for i in 1..=stdout_lines {
        writeln!(out, "stdout line {}", i)?;
    }
    out.flush()?;

    let mut err = std::io::stderr().lock();
    for i in 1..=stderr_lines {
        writeln!(err, "stderr line {}", i)?;
    }
    err.flush()?;
    Ok(())
}

/// `<pid-file>.child`
fn child_pid_file(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".child");
    PathBuf::from(name)
}

fn spawn_grandchild(pid_file: &Path) -> Result<()> {
    let exe = std::env::current_exe().context("failed to locate testexe")?;
    let child = std::process::Command::new(exe)
        .arg("--pid-file")
        .arg(pid_file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to spawn grandchild")?;
    info!("Spawned grandchild {}", child.id());
    Ok(())
}

fn ignore_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::spawn(async move {
                    while sigterm.recv().await.is_some() {
                        warn!("Ignoring SIGTERM");
                    }
                });
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    tokio::spawn(async {
        while tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ignoring Ctrl+C");
        }
    });
}

fn atomic_write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "pid".to_string());
    let tmp_path = path.with_file_name(format!("{}.tmp-{}-{}", file_name, std::process::id(), nanos));

    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)
}
