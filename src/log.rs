//! Run logging for tirunner.
//!
//! Log levels:
//! - FATAL: Startup or connection failures that abort the run
//! - ERROR: A single task failed (the run continues)
//! - WARNING: Unexpected but recoverable conditions (e.g. defaulted arguments)
//! - INFO: Run progress and one line per task outcome
//! - DEBUG: Detailed traces, written to the log file only
//!
//! Every sink receives the same line format:
//! `2024-01-31 12:00:00,123 - tirunner - INFO - message`.
//!
//! A [`Logger`] is created once at startup and handed to the components
//! that write to it. Clones share the same sinks.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::Result;

/// Log levels for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Fatal = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

enum Target {
    File(File),
    Console,
    Memory(Arc<Mutex<Vec<String>>>),
}

struct Sink {
    min_level: LogLevel,
    target: Target,
}

impl Sink {
    fn write_line(&mut self, line: &str) {
        match &mut self.target {
            Target::File(file) => {
                let _ = writeln!(file, "{}", line);
            }
            Target::Console => eprintln!("{}", line),
            Target::Memory(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line.to_string());
                }
            }
        }
    }
}

/// Lines captured by a memory sink.
#[derive(Clone, Default)]
pub struct CapturedLines(Arc<Mutex<Vec<String>>>);

impl CapturedLines {
    /// Snapshot of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

/// Named logger writing formatted lines to one or more sinks.
///
/// Safe to share between workers; each line is written under a single
/// lock so lines from concurrent tasks never interleave.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    sinks: Arc<Mutex<Vec<Sink>>>,
}

impl Logger {
    /// Create a logger with no sinks. Lines are dropped until one is added.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            sinks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Logger writing DEBUG and above to `path` and INFO and above to stderr.
    pub fn init(name: &str, path: &Path) -> Result<Self> {
        Ok(Self::new(name)
            .with_file(path, LogLevel::Debug)?
            .with_console(LogLevel::Info))
    }

    /// Append lines at or above `min_level` to the file at `path`.
    pub fn with_file(self, path: &Path, min_level: LogLevel) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.push(Sink {
            min_level,
            target: Target::File(file),
        });
        Ok(self)
    }

    /// Write lines at or above `min_level` to stderr.
    pub fn with_console(self, min_level: LogLevel) -> Self {
        self.push(Sink {
            min_level,
            target: Target::Console,
        });
        self
    }

    /// Capture lines at or above `min_level` in memory.
    pub fn with_capture(self, min_level: LogLevel) -> (Self, CapturedLines) {
        let captured = CapturedLines::default();
        self.push(Sink {
            min_level,
            target: Target::Memory(Arc::clone(&captured.0)),
        });
        (self, captured)
    }

    fn push(&self, sink: Sink) {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(sink);
        }
    }

    /// Format a line the way every sink writes it.
    pub fn format_line(&self, level: LogLevel, msg: &str) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        format!("{} - {} - {} - {}", timestamp, self.name, level.as_str(), msg)
    }

    /// Log a message at the specified level.
    pub fn log_at(&self, level: LogLevel, msg: &str) {
        let Ok(mut sinks) = self.sinks.lock() else {
            return;
        };
        if sinks.iter().all(|s| level < s.min_level) {
            return;
        }
        let line = self.format_line(level, msg);
        for sink in sinks.iter_mut().filter(|s| level >= s.min_level) {
            sink.write_line(&line);
        }
    }

    pub fn debug(&self, msg: &str) {
        self.log_at(LogLevel::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log_at(LogLevel::Info, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.log_at(LogLevel::Warning, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log_at(LogLevel::Error, msg);
    }

    pub fn fatal(&self, msg: &str) {
        self.log_at(LogLevel::Fatal, msg);
    }
}

/// Log macro for DEBUG level (file sink only by default).
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
    };
}

/// Log macro for INFO level.
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
    };
}

/// Log macro for WARNING level.
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
    };
}

/// Log macro for ERROR level.
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(&format!($($arg)*))
    };
}

/// Log macro for FATAL level.
#[macro_export]
macro_rules! log_fatal {
    ($logger:expr, $($arg:tt)*) => {
        $logger.fatal(&format!($($arg)*))
    };
}
