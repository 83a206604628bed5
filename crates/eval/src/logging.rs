//! Logging boundary.
//!
//! The evaluator never writes to a terminal: it emits records through an
//! injected [`Logger`]. [`MemoryLogger`] collects records (and counts
//! warnings and errors) for tests and for the compilation summary.

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::str::FromStr;

/// Log severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Alert,
    Emergency,
    Critical,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.to_lowercase().as_str() {
            "debug" => Level::Debug,
            "info" => Level::Info,
            "notice" => Level::Notice,
            "warning" => Level::Warning,
            "err" | "error" => Level::Error,
            "alert" => Level::Alert,
            "emerg" | "emergency" => Level::Emergency,
            "crit" | "critical" => Level::Critical,
            _ => {
                return Err(format!(
                    "invalid log level '{}': expected debug, info, notice, warning, error, alert, emergency, or critical.",
                    value
                ))
            }
        })
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Notice => "Notice",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Alert => "Alert",
            Level::Emergency => "Emergency",
            Level::Critical => "Critical",
        })
    }
}

/// A single log record as handed to the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub level: Level,
    pub line: usize,
    pub column: usize,
    pub text: Option<String>,
    pub path: Option<String>,
    pub message: String,
}

/// The injected logging boundary.
pub trait Logger {
    /// Whether a record at this level would be kept. Callers may skip
    /// formatting work when this returns false.
    fn would_log(&self, level: Level) -> bool;

    fn log(
        &self,
        level: Level,
        line: usize,
        column: usize,
        text: Option<&str>,
        path: Option<&str>,
        message: &str,
    );

    /// Log a message with no source context.
    fn log_message(&self, level: Level, message: &str) {
        self.log(level, 0, 0, None, None, message);
    }
}

/// Collects records in memory and counts warnings and errors.
pub struct MemoryLogger {
    level: Cell<Level>,
    records: RefCell<Vec<LogRecord>>,
    warnings: Cell<usize>,
    errors: Cell<usize>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        MemoryLogger {
            level: Cell::new(Level::Notice),
            records: RefCell::new(Vec::new()),
            warnings: Cell::new(0),
            errors: Cell::new(0),
        }
    }

    pub fn with_level(level: Level) -> Self {
        let logger = Self::new();
        logger.level.set(level);
        logger
    }

    pub fn set_level(&self, level: Level) {
        self.level.set(level);
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    /// Records at exactly the given level.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn warnings(&self) -> usize {
        self.warnings.get()
    }

    pub fn errors(&self) -> usize {
        self.errors.get()
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn would_log(&self, level: Level) -> bool {
        level >= self.level.get()
    }

    fn log(
        &self,
        level: Level,
        line: usize,
        column: usize,
        text: Option<&str>,
        path: Option<&str>,
        message: &str,
    ) {
        if !self.would_log(level) {
            return;
        }
        if level == Level::Warning {
            self.warnings.set(self.warnings.get() + 1);
        } else if level >= Level::Error {
            self.errors.set(self.errors.get() + 1);
        }
        self.records.borrow_mut().push(LogRecord {
            level,
            line,
            column,
            text: text.map(str::to_owned),
            path: path.map(str::to_owned),
            message: message.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_accepts_short_spellings() {
        assert_eq!("err".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("emerg".parse::<Level>().unwrap(), Level::Emergency);
        assert_eq!("crit".parse::<Level>().unwrap(), Level::Critical);
        assert_eq!("Notice".parse::<Level>().unwrap(), Level::Notice);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn memory_logger_counts_and_filters() {
        let logger = MemoryLogger::new();
        logger.log_message(Level::Debug, "dropped below threshold");
        logger.log_message(Level::Notice, "kept");
        logger.log_message(Level::Warning, "warned");
        logger.log_message(Level::Error, "failed");
        assert_eq!(logger.records().len(), 3);
        assert_eq!(logger.warnings(), 1);
        assert_eq!(logger.errors(), 1);
        assert_eq!(logger.messages_at(Level::Notice), vec!["kept"]);
    }
}
