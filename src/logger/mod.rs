//! Crawl log
//!
//! Every crawl event is recorded three ways:
//! - in a bounded in-memory ring (for `recent` lookups)
//! - appended to a durable log file, one formatted line per entry
//! - mirrored to the console through `tracing`
//!
//! Logging never fails: sink errors are reported through `tracing` and dropped.

use crate::model::now_iso8601;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Severity of a crawl log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// A single structured log entry
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl LogEntry {
    /// Formats the entry as `[timestamp] [LEVEL] message - {details}`
    pub fn format_line(&self) -> String {
        match &self.details {
            Some(details) => format!(
                "[{}] [{}] {} - {}",
                self.timestamp, self.level, self.message, details
            ),
            None => format!("[{}] [{}] {}", self.timestamp, self.level, self.message),
        }
    }
}

struct LogState {
    recent: VecDeque<LogEntry>,
    sink: Option<File>,
}

/// Append-only crawl log shared by the crawler, the store and the scheduler
pub struct CrawlLogger {
    capacity: usize,
    path: Option<PathBuf>,
    state: Mutex<LogState>,
}

impl CrawlLogger {
    /// Creates a logger that appends to `path`
    ///
    /// Missing parent directories are created. If the file cannot be opened
    /// the logger keeps working without a durable sink.
    pub fn new(path: impl AsRef<Path>, capacity: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let sink = match open_sink(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::error!("Failed to open log file {}: {}", path.display(), e);
                None
            }
        };

        Self {
            capacity: capacity.max(1),
            path: Some(path),
            state: Mutex::new(LogState {
                recent: VecDeque::with_capacity(capacity.max(1)),
                sink,
            }),
        }
    }

    /// Creates a logger without a durable sink
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            path: None,
            state: Mutex::new(LogState {
                recent: VecDeque::with_capacity(capacity.max(1)),
                sink: None,
            }),
        }
    }

    /// Path of the durable sink, if one was configured
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records an entry
    pub fn log(&self, level: LogLevel, message: impl Into<String>, details: Option<Value>) {
        let entry = LogEntry {
            timestamp: now_iso8601(),
            level,
            message: message.into(),
            details,
        };
        let line = entry.format_line();

        match level {
            LogLevel::Info => tracing::info!("{}", line),
            LogLevel::Warning => tracing::warn!("{}", line),
            LogLevel::Error => tracing::error!("{}", line),
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(sink) = state.sink.as_mut() {
            if let Err(e) = writeln!(sink, "{}", line) {
                tracing::error!("Failed to write log entry: {}", e);
            }
        }

        if state.recent.len() == self.capacity {
            state.recent.pop_front();
        }
        state.recent.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>, details: Option<Value>) {
        self.log(LogLevel::Info, message, details);
    }

    pub fn warning(&self, message: impl Into<String>, details: Option<Value>) {
        self.log(LogLevel::Warning, message, details);
    }

    pub fn error(&self, message: impl Into<String>, details: Option<Value>) {
        self.log(LogLevel::Error, message, details);
    }

    /// Returns up to `count` of the most recent entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = state.recent.len().saturating_sub(count);
        state.recent.iter().skip(skip).cloned().collect()
    }
}

fn open_sink(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}
