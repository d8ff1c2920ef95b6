//! User-facing run log: entries and the bounded, newest-first stream.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};

/// Default number of entries kept in a log stream
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Info => "info",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    /// Shortened account address, when the entry concerns one account
    pub account: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(account: Option<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Local::now(),
            account,
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(None, message, Severity::Info)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(None, message, Severity::Error)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.timestamp.format("%H:%M:%S%.3f"))?;
        if let Some(account) = &self.account {
            write!(f, "{} ", account)?;
        }
        f.write_str(&self.message)
    }
}

/// Newest-first log stream, keeping at most `capacity` entries
#[derive(Debug, Clone)]
pub struct LogStream {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogStream {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl LogStream {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Prepend one entry, then evict the oldest beyond capacity
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Prepend a batch so that its last entry ends up newest
    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        for entry in entries {
            self.entries.push_front(entry);
        }
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }
}
