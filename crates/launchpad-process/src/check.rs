//! Process existence checking.
//!
//! Provides a cross-platform function to check if a process exists.

use launchpad_common::{LaunchError, LaunchResult};

/// Check if a process with the given PID exists.
///
/// On Unix this uses `kill(pid, 0)`, which sends no signal but checks if the
/// process exists. A zombie that has not been reaped yet still counts as
/// existing. On Windows it uses `OpenProcess`.
///
/// # Returns
///
/// * `Ok(true)` - Process exists
/// * `Ok(false)` - Process does not exist, or `pid <= 0`
/// * `Err(_)` - The check itself failed
///
/// # Examples
///
/// ```rust,no_run
/// use launchpad_process::process_exists;
///
/// if process_exists(1234).unwrap() {
///     println!("Process 1234 is running");
/// }
/// ```
pub fn process_exists(pid: i32) -> LaunchResult<bool> {
    if pid <= 0 {
        return Ok(false);
    }

    #[cfg(unix)]
    {
        process_exists_unix(pid)
    }

    #[cfg(windows)]
    {
        process_exists_windows(pid)
    }
}

#[cfg(unix)]
fn process_exists_unix(pid: i32) -> LaunchResult<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid), None) {
        Ok(_) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        // Exists, but belongs to someone else
        Err(Errno::EPERM) => Ok(true),
        Err(e) => Err(LaunchError::monitor(pid, format!("failed to check process: {}", e))),
    }
}

#[cfg(windows)]
fn process_exists_windows(pid: i32) -> LaunchResult<bool> {
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    unsafe {
        let handle: HANDLE = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid as u32) {
            Ok(h) => h,
            Err(e) => {
                // ERROR_INVALID_PARAMETER means there is no such process
                let error_code = e.code().0 as u32;
                const ERROR_INVALID_PARAMETER: u32 = 0x80070057;
                const ERROR_ACCESS_DENIED: u32 = 0x80070005;

                if error_code == ERROR_INVALID_PARAMETER {
                    return Ok(false);
                }
                if error_code == ERROR_ACCESS_DENIED {
                    return Ok(true);
                }
                return Err(LaunchError::monitor(pid, format!("failed to check process: {}", e)));
            }
        };

        let _ = CloseHandle(handle);
        Ok(true)
    }
}
