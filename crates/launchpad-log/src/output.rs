//! Sinks that store events: a daily log file and an in-memory buffer

use crate::sink::EventSink;
use crate::types::{LogLevel, LogRecord};
use chrono::Local;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Daily log file sink.
///
/// Events land in `<directory>/<base>_<yyyyMMdd>.log`, one line each:
/// `yyyy-MM-dd HH:mm:ss.fff|<pid>|<LEVEL>|<message>`. The date is checked on
/// every write so a long-running launcher switches files at midnight.
/// Write failures are swallowed; losing a log line must never disturb the
/// supervised task.
pub struct FileEventSink {
    directory: PathBuf,
    base_name: String,
    process_id: u32,
    current: Mutex<Option<OpenLog>>,
}

struct OpenLog {
    date: String,
    file: File,
}

impl FileEventSink {
    /// Create a sink writing below `directory`.
    ///
    /// `file_name` may carry a `.log` suffix; everything from the first
    /// `.log` on is dropped to form the base name.
    pub fn new(directory: impl Into<PathBuf>, file_name: &str) -> std::io::Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;

        let base_name = file_name
            .split(".log")
            .next()
            .unwrap_or(file_name)
            .to_string();

        Ok(Self {
            directory,
            base_name,
            process_id: std::process::id(),
            current: Mutex::new(None),
        })
    }

    /// Create a sink writing into `./log` relative to `app_directory`.
    pub fn in_app_directory(app_directory: &Path, file_name: &str) -> std::io::Result<Self> {
        Self::new(app_directory.join("log"), file_name)
    }

    /// Path of the file an event written today would land in.
    pub fn current_path(&self) -> PathBuf {
        self.path_for(&Local::now().format("%Y%m%d").to_string())
    }

    fn path_for(&self, date: &str) -> PathBuf {
        self.directory.join(format!("{}_{}.log", self.base_name, date))
    }

    fn format_line(&self, level: LogLevel, message: &str) -> String {
        format!(
            "{}|{}|{}|{}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            self.process_id,
            level,
            message
        )
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let today = Local::now().format("%Y%m%d").to_string();
        let mut current = self.current.lock();

        let reopen = match current.as_ref() {
            Some(open) => open.date != today,
            None => true,
        };
        if reopen {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(&today))?;
            *current = Some(OpenLog { date: today, file });
        }

        match current.as_mut() {
            Some(open) => open.file.write_all(line.as_bytes()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FileEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEventSink")
            .field("directory", &self.directory)
            .field("base_name", &self.base_name)
            .finish()
    }
}

impl EventSink for FileEventSink {
    fn write(&self, level: LogLevel, message: &str) {
        let line = self.format_line(level, message);
        if let Err(e) = self.append(&line) {
            tracing::debug!(error = %e, "dropping log line");
        }
    }
}

/// Keeps the most recent events in memory.
#[derive(Debug)]
pub struct BufferEventSink {
    records: Mutex<VecDeque<LogRecord>>,
    max_size: usize,
}

impl BufferEventSink {
    pub fn new(max_size: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_size.min(1024))),
            max_size: max_size.max(1),
        }
    }

    /// Snapshot of the retained events, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn count_at(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|r| r.level == level).count()
    }

    /// True when any retained event at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl EventSink for BufferEventSink {
    fn write(&self, level: LogLevel, message: &str) {
        let mut records = self.records.lock();
        records.push_back(LogRecord {
            timestamp: Local::now(),
            level,
            message: message.to_string(),
        });

        // Keep only last max_size entries
        while records.len() > self.max_size {
            records.pop_front();
        }
    }
}
