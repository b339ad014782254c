//! Process execution primitives.
//!
//! Builds and spawns the child described by a [`TaskDescriptor`].

use launchpad_common::{LaunchError, LaunchResult, TaskDescriptor};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Environment hint asking interpreters to flush output line by line.
pub const UNBUFFERED_ENV: (&str, &str) = ("PYTHONUNBUFFERED", "1");

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Build the command for `task`.
///
/// Stdout and stderr are piped, stdin is closed and the unbuffered-output
/// hint is set. The child gets its own process group (Unix) or a new
/// process group without a console window (Windows) so the whole tree can
/// later be killed as one unit without touching the launcher.
pub fn build_command(task: &TaskDescriptor) -> Command {
    let mut cmd = Command::new(task.executable_path());
    cmd.args(task.arguments())
        .env(UNBUFFERED_ENV.0, UNBUFFERED_ENV.1)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    #[cfg(windows)]
    {
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
    }

    cmd
}

/// Spawn the child for `task`.
pub fn spawn_task(task: &TaskDescriptor) -> LaunchResult<Child> {
    build_command(task)
        .spawn()
        .map_err(|e| LaunchError::spawn_failed(task.executable_path(), e.to_string()))
}
