use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

/// Severity of a diagnostic line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Normal progress.
    Info,

    /// A recoverable failure, such as one failed key attempt.
    Warn,

    /// A failure reported to the user.
    Error,
}

/// One timestamped line of the diagnostic log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// When the line was recorded.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Severity.
    pub level: LogLevel,

    /// The diagnostic text.
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current UTC time.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            level,
            message: message.into(),
        }
    }

    /// Shorthand for an info entry.
    pub fn info(message: impl Into<String>) -> Self {
        Self::now(LogLevel::Info, message)
    }

    /// Shorthand for a warning entry.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::now(LogLevel::Warn, message)
    }

    /// Shorthand for an error entry.
    pub fn error(message: impl Into<String>) -> Self {
        Self::now(LogLevel::Error, message)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        match self.timestamp.format(&format) {
            Ok(stamp) => write!(f, "[{stamp}] {}", self.message),
            Err(_) => write!(f, "[{}] {}", self.timestamp.unix_timestamp(), self.message),
        }
    }
}
