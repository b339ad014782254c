//! Core domain types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to launch and how to label it.
///
/// Created once when a supervisor is built and never mutated afterwards, so
/// it can be shared freely between the caller and the monitoring routine.
///
/// # Example
/// ```
/// use launchpad_common::TaskDescriptor;
///
/// let task = TaskDescriptor::parse_line("Echo|echo|hello world").unwrap();
/// assert_eq!(task.display_name(), "Echo");
/// assert_eq!(task.arguments(), vec!["hello", "world"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskDescriptor {
    display_name: String,
    executable_path: String,
    argument_string: String,
}

impl TaskDescriptor {
    pub fn new(
        display_name: impl Into<String>,
        executable_path: impl Into<String>,
        argument_string: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            executable_path: executable_path.into(),
            argument_string: argument_string.into(),
        }
    }

    /// Parse a `displayName|executablePath|argumentString` record.
    ///
    /// Returns `None` when fewer than three fields are present. Fields past
    /// the third are ignored.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split('|');
        let display_name = parts.next()?;
        let executable_path = parts.next()?;
        let argument_string = parts.next()?;
        Some(Self::new(display_name, executable_path, argument_string))
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn executable_path(&self) -> &str {
        &self.executable_path
    }

    pub fn argument_string(&self) -> &str {
        &self.argument_string
    }

    /// The argument string split into argv entries.
    pub fn arguments(&self) -> Vec<String> {
        split_arguments(&self.argument_string)
    }

    /// Label shown while a run is active.
    pub fn running_label(&self) -> String {
        format!("stop {}", self.display_name)
    }
}

impl Default for TaskDescriptor {
    fn default() -> Self {
        Self::new("Show Win Ver", "winver", "--admin")
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {})",
            self.display_name, self.executable_path, self.argument_string
        )
    }
}

/// Split a command-line argument string into argv entries.
///
/// Whitespace separates arguments, double quotes group text containing
/// whitespace and `\"` yields a literal quote.
pub fn split_arguments(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                pending = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }

    if pending {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let task = TaskDescriptor::parse_line("Run Script|python|-u main.py").unwrap();
        assert_eq!(task.display_name(), "Run Script");
        assert_eq!(task.executable_path(), "python");
        assert_eq!(task.argument_string(), "-u main.py");
        assert_eq!(task.running_label(), "stop Run Script");
    }

    #[test]
    fn test_parse_line_rejects_short_records() {
        assert!(TaskDescriptor::parse_line("only|two").is_none());
        assert!(TaskDescriptor::parse_line("").is_none());
    }

    #[test]
    fn test_parse_line_ignores_extra_fields() {
        let task = TaskDescriptor::parse_line("a|b|c|d").unwrap();
        assert_eq!(task.argument_string(), "c");
    }

    #[test]
    fn test_parse_line_keeps_empty_arguments() {
        let task = TaskDescriptor::parse_line("Notepad|notepad.exe|").unwrap();
        assert!(task.arguments().is_empty());
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(split_arguments("  -a  -b "), vec!["-a", "-b"]);
        assert_eq!(
            split_arguments(r#"--name "hello world" x"#),
            vec!["--name", "hello world", "x"]
        );
        assert_eq!(split_arguments(r#"say \"hi\""#), vec!["say", "\"hi\""]);
        assert_eq!(split_arguments(r#""""#), vec![""]);
        assert!(split_arguments("").is_empty());
    }

    #[test]
    fn test_default_descriptor() {
        let task = TaskDescriptor::default();
        assert_eq!(task.display_name(), "Show Win Ver");
        assert_eq!(task.executable_path(), "winver");
        assert_eq!(task.argument_string(), "--admin");
    }
}
