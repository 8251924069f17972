//! Bounded buffer of structured log entries pushed by the host.
//!
//! Uses a fixed-capacity ring buffer; the oldest entry is evicted first.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Entries retained by default.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Severity of a host log entry. Unknown levels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    Info,
    Debug,
    Warning,
    Error,
    Other(String),
}

impl From<String> for LogLevel {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            "WARNING" | "WARN" => Self::Warning,
            "ERROR" => Self::Error,
            _ => Self::Other(raw),
        }
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("INFO"),
            Self::Debug => f.write_str("DEBUG"),
            Self::Warning => f.write_str("WARNING"),
            Self::Error => f.write_str("ERROR"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// One log line from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Host-supplied timestamp, kept as sent.
    #[serde(default)]
    pub timestamp: String,
    pub level: LogLevel,
    #[serde(default)]
    pub source: String,
    pub message: String,
}

impl LogEntry {
    /// Build an entry stamped with the current time.
    #[must_use]
    pub fn now(level: LogLevel, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            level,
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Last-N log entries, oldest first.
#[derive(Debug, Clone)]
pub struct LogRingBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogRingBuffer {
    /// Create a buffer retaining at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer seeded with the "panel initialized" line shown before the
    /// host has sent anything.
    #[must_use]
    pub fn seeded(capacity: usize) -> Self {
        let mut buffer = Self::new(capacity);
        buffer.append(LogEntry::now(
            LogLevel::Info,
            "System",
            "Log panel initialized. Waiting for backend messages.",
        ));
        buffer
    }

    /// Append an entry, evicting from the front past capacity.
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LogRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn entry(i: usize) -> LogEntry {
        LogEntry {
            timestamp: format!("t{i}"),
            level: LogLevel::Info,
            source: "Test".to_owned(),
            message: format!("line {i}"),
        }
    }

    #[test]
    fn keeps_last_hundred_in_order() {
        let mut logs = LogRingBuffer::default();
        for i in 0..150 {
            logs.append(entry(i));
        }
        assert_eq!(logs.len(), 100);
        let messages: Vec<String> = logs.iter().map(|e| e.message.clone()).collect();
        let expected: Vec<String> = (50..150).map(|i| format!("line {i}")).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut logs = LogRingBuffer::new(4);
        logs.append(entry(1));
        logs.append(entry(1));
        assert_eq!(logs.len(), 2);
    }

    #[test]
    fn seed_line_counts_toward_capacity() {
        let mut logs = LogRingBuffer::seeded(2);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs.iter().next().unwrap().source, "System");
        logs.append(entry(1));
        logs.append(entry(2));
        assert_eq!(logs.len(), 2);
        assert_eq!(logs.iter().next().unwrap().message, "line 1");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut logs = LogRingBuffer::new(0);
        logs.append(entry(1));
        logs.append(entry(2));
        assert_eq!(logs.capacity(), 1);
        assert_eq!(logs.to_vec(), vec![entry(2)]);
    }

    #[test]
    fn level_round_trips_known_and_unknown_values() {
        let parsed: LogEntry = serde_json::from_value(serde_json::json!({
            "timestamp": "2024-01-01T00:00:00",
            "level": "warning",
            "source": "Ollama",
            "message": "no models"
        }))
        .unwrap();
        assert_eq!(parsed.level, LogLevel::Warning);

        let custom: LogLevel = serde_json::from_value(serde_json::json!("TRACE")).unwrap();
        assert_eq!(custom, LogLevel::Other("TRACE".to_owned()));
        assert_eq!(serde_json::to_value(&custom).unwrap(), "TRACE");
        assert_eq!(serde_json::to_value(LogLevel::Error).unwrap(), "ERROR");
    }
}
