//! Console stand-in for the launcher window.

use launchpad_supervisor::LabelSink;
use std::fmt;
use std::io::Write;

/// One line typed on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Button click
    Toggle,
    /// Print the supervisor state
    Status,
    /// Close the window
    Quit,
}

impl Command {
    /// `t`/`toggle` or an empty line clicks, `s`/`status` reports, `q`/`quit`
    /// closes. Case-insensitive.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "t" | "toggle" => Some(Command::Toggle),
            "s" | "status" => Some(Command::Status),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Why the window closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    UserClosing,
    Signal(&'static str),
    RunDurationElapsed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::UserClosing => write!(f, "user closing"),
            CloseReason::Signal(name) => write!(f, "signal {}", name),
            CloseReason::RunDurationElapsed => write!(f, "run duration elapsed"),
        }
    }
}

/// Prints every button label change to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLabel;

impl LabelSink for ConsoleLabel {
    fn set_label(&self, label: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[button] {}", label);
        let _ = out.flush();
    }
}
