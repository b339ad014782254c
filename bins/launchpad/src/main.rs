use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use launchpad_log::{EventSink, FileEventSink, MultiEventSink, TracingEventSink};
use launchpad_supervisor::{
    load_app_config, load_task_descriptor, LabelSink, ProcessSupervisor, StartPosition,
};

mod commands;

use commands::{CloseReason, Command, ConsoleLabel};

/// Launchpad - one button that starts or stops a configured task
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Application directory holding task.txt, app.json and log/
    /// (defaults to the directory of the executable)
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Product log file name; the date is appended to its base name
    #[arg(long, value_name = "NAME", default_value = "admin")]
    log_name: String,

    /// Click the button once at startup
    #[arg(long)]
    auto_start: bool,

    /// Run duration in seconds (for testing)
    #[arg(long)]
    run_duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    let app_directory = resolve_app_directory(args.dir.as_deref())?;
    std::env::set_current_dir(&app_directory).with_context(|| {
        format!("failed to enter application directory {}", app_directory.display())
    })?;

    let file_sink = FileEventSink::in_app_directory(&app_directory, &args.log_name)
        .context("failed to open the product log")?;
    info!("Product log: {}", file_sink.current_path().display());
    let sink: Arc<dyn EventSink> = Arc::new(
        MultiEventSink::new()
            .with(Arc::new(file_sink))
            .with(Arc::new(TracingEventSink)),
    );

    sink.info(&format!("application started|{}", app_directory.display()));

    let config = load_app_config(&app_directory, sink.as_ref());
    let task = load_task_descriptor(&app_directory, sink.as_ref());
    match config.start_position().filter(StartPosition::is_manual) {
        Some(pos) => info!("Window placed at ({},{})", pos.x, pos.y),
        None => debug!("Window centred on screen"),
    }
    info!("Task: {}", task);

    let supervisor = ProcessSupervisor::builder(task.clone())
        .sink(Arc::clone(&sink))
        .labels(Arc::new(ConsoleLabel))
        .options(config.supervisor_options())
        .terminator(config.terminator(Arc::clone(&sink)))
        .build()?;
    ConsoleLabel.set_label(task.display_name());

    if args.auto_start {
        click(&supervisor, sink.as_ref());
    }

    let reason = run_event_loop(&supervisor, sink.as_ref(), args.run_duration).await;

    sink.info(&format!("window closing, reason: {}", reason));
    if supervisor.shutdown().await {
        debug!("Active run stopped during shutdown");
    }
    if !supervisor.flush_labels(Duration::from_secs(1)).await {
        warn!("Button label updates still pending at exit");
    }
    sink.info("resource cleanup finished");
    sink.info("application closed");

    Ok(())
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn resolve_app_directory(dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let exe = std::env::current_exe().context("failed to locate the executable")?;
            exe.parent()
                .map(Path::to_path_buf)
                .context("executable has no parent directory")?
        }
    };

    std::fs::canonicalize(&dir)
        .with_context(|| format!("application directory {} is not accessible", dir.display()))
}

fn click(supervisor: &ProcessSupervisor, sink: &dyn EventSink) {
    sink.info("button clicked");
    supervisor.toggle();
    sink.info("button click handled");
}

/// Feed stdin lines into a channel from a plain thread, so a pending read
/// never holds up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

async fn run_event_loop(
    supervisor: &ProcessSupervisor,
    sink: &dyn EventSink,
    run_duration: Option<u64>,
) -> CloseReason {
    let mut input = spawn_stdin_reader();
    let mut input_open = true;

    let signal = shutdown_signal();
    tokio::pin!(signal);

    let deadline = run_duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let elapsed = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(elapsed);

    if let Some(secs) = run_duration {
        info!("Running for {} seconds (test mode)", secs);
    }

    loop {
        tokio::select! {
            line = input.recv(), if input_open => match line {
                Some(line) => match Command::parse(&line) {
                    Some(Command::Toggle) => click(supervisor, sink),
                    Some(Command::Status) => println!(
                        "[status] {} pid={}",
                        supervisor.state(),
                        supervisor.current_pid().map(|p| p.to_string()).unwrap_or_else(|| "-".into())
                    ),
                    Some(Command::Quit) => return CloseReason::UserClosing,
                    None => warn!("Unknown command: {:?} (t = toggle, s = status, q = quit)", line.trim()),
                },
                None => {
                    debug!("stdin closed, waiting for a signal");
                    input_open = false;
                }
            },
            name = &mut signal => return CloseReason::Signal(name),
            _ = &mut elapsed => return CloseReason::RunDurationElapsed,
        }
    }
}

async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        match (
            unix_signal(SignalKind::terminate()),
            unix_signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        "SIGTERM"
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT signal");
                        "SIGINT"
                    }
                }
            }
            _ => {
                warn!("Failed to install signal handlers, falling back to Ctrl+C");
                wait_ctrl_c().await
            }
        }
    }

    #[cfg(windows)]
    {
        wait_ctrl_c().await
    }
}

async fn wait_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C signal");
    "Ctrl+C"
}
