//! Launcher configuration: `task.txt` and `app.json` in the application
//! directory.
//!
//! Both loaders never fail: a missing file keeps the defaults silently, an
//! unreadable or malformed one keeps the defaults and reports an ERROR to the
//! event sink.

use crate::options::{ExitedStopPolicy, SupervisorOptions};
use anyhow::{bail, Context, Result};
use launchpad_common::TaskDescriptor;
use launchpad_log::EventSink;
use launchpad_process::{KillCommand, ProcessTerminator, PID_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// File holding the task descriptor line.
pub const TASK_FILE: &str = "task.txt";

/// File holding the launcher settings.
pub const APP_CONFIG_FILE: &str = "app.json";

/// Window position requested by `startPos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPosition {
    pub x: i32,
    pub y: i32,
}

impl StartPosition {
    /// Parse `"x,y"`. Extra fields are ignored, whitespace around numbers too.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(',');
        let x = parts.next()?.trim().parse().ok()?;
        let y = parts.next()?.trim().parse().ok()?;
        Some(Self { x, y })
    }

    /// Whether the presentation layer should place the window manually.
    /// A zero coordinate means "centre on screen".
    pub fn is_manual(&self) -> bool {
        self.x != 0 && self.y != 0
    }
}

/// Contents of `app.json`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_pos: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminate_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_drain_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_stop_policy: Option<ExitedStopPolicy>,

    /// External tree-kill tool, e.g. `["taskkill", "/PID", "{pid}", "/T", "/F"]`.
    /// Unset means the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_command: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a JSON string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(content.trim_start_matches('\u{feff}'))
            .context("failed to parse JSON configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == Some(0) {
            bail!("pollIntervalMs must be greater than zero");
        }
        if self.terminate_timeout_ms == Some(0) {
            bail!("terminateTimeoutMs must be greater than zero");
        }
        if let Some(command) = &self.kill_command {
            match command.first() {
                None => bail!("killCommand must name a program"),
                Some(program) if program.trim().is_empty() => {
                    bail!("killCommand must name a program")
                }
                Some(_) => {}
            }
            if !command.iter().any(|arg| arg.contains(PID_PLACEHOLDER)) {
                bail!("killCommand must contain the {} placeholder", PID_PLACEHOLDER);
            }
        }
        Ok(())
    }

    /// Parsed `startPos`, when present and well formed.
    pub fn start_position(&self) -> Option<StartPosition> {
        self.start_pos.as_deref().and_then(StartPosition::parse)
    }

    /// Supervisor options with the configured overrides applied.
    pub fn supervisor_options(&self) -> SupervisorOptions {
        let mut options = SupervisorOptions::default();
        if let Some(ms) = self.poll_interval_ms {
            options.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.terminate_timeout_ms {
            options.terminate_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.output_drain_timeout_ms {
            options.output_drain_timeout = Duration::from_millis(ms);
        }
        if let Some(policy) = self.exited_stop_policy {
            options.exited_stop_policy = policy;
        }
        options
    }

    /// Terminator matching this configuration.
    pub fn terminator(&self, sink: Arc<dyn EventSink>) -> ProcessTerminator {
        let timeout = self.supervisor_options().terminate_timeout;
        let terminator = match self.kill_command.as_deref() {
            Some([program, args @ ..]) => ProcessTerminator::with_strategy(
                Arc::new(KillCommand::new(program.clone(), args.iter().cloned())),
                sink,
            ),
            _ => ProcessTerminator::new(sink),
        };
        terminator.with_timeout(timeout)
    }
}

/// Load `app.json` from `app_directory`.
pub fn load_app_config(app_directory: &Path, sink: &dyn EventSink) -> AppConfig {
    let path = app_directory.join(APP_CONFIG_FILE);
    if !path.exists() {
        return AppConfig::default();
    }

    match AppConfig::load_from_file(&path) {
        Ok(config) => {
            if let Some(pos) = config.start_position() {
                sink.info(&format!("start position: ({},{})", pos.x, pos.y));
            }
            config
        }
        Err(e) => {
            sink.error(&format!("failed to parse configuration file: {:#}", e));
            AppConfig::default()
        }
    }
}

/// Load the task descriptor from the first line of `task.txt`.
pub fn load_task_descriptor(app_directory: &Path, sink: &dyn EventSink) -> TaskDescriptor {
    let path = app_directory.join(TASK_FILE);
    if !path.exists() {
        return TaskDescriptor::default();
    }

    match read_first_line(&path) {
        Ok(line) => TaskDescriptor::parse_line(&line).unwrap_or_default(),
        Err(e) => {
            sink.error(&format!("failed to read task configuration: {:#}", e));
            TaskDescriptor::default()
        }
    }
}

fn read_first_line(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let line = content.lines().next().unwrap_or_default();
    Ok(line.trim_start_matches('\u{feff}').to_string())
}
