//! Operator-facing activity log.
//!
//! Separate from `tracing` output: this is the short, human-readable feed an
//! operator sees next to the target list.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

/// Number of entries retained.
pub const ACTIVITY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: i64,
    pub message: String,
    pub level: LogLevel,
}

/// Bounded, newest-first log.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            id: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            message: message.into(),
            level,
        };

        let mut entries = self.entries.lock();
        entries.push_front(entry);
        entries.truncate(ACTIVITY_CAPACITY);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(LogLevel::Success, message);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_and_bounded() {
        let log = ActivityLog::new();
        for i in 0..(ACTIVITY_CAPACITY + 20) {
            log.info(format!("entry {}", i));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), ACTIVITY_CAPACITY);
        assert_eq!(entries[0].message, format!("entry {}", ACTIVITY_CAPACITY + 19));
        assert_eq!(entries[ACTIVITY_CAPACITY - 1].message, "entry 20");
    }

    #[test]
    fn test_levels_and_clear() {
        let log = ActivityLog::new();
        log.error("api.test is DOWN");
        log.success("api.test is back up");
        assert_eq!(log.entries()[0].level, LogLevel::Success);
        assert_eq!(log.entries()[1].level, LogLevel::Error);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_entry_wire_shape() {
        let log = ActivityLog::new();
        log.info("hello");
        let value = serde_json::to_value(&log.entries()[0]).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["message"], "hello");
        assert!(value["timestamp"].as_i64().is_some());
    }
}
