//! Operator event log

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

const BROADCAST_CAPACITY: usize = 256;

/// Kind of an operator-visible event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Info,
    Success,
    Error,
}

/// An immutable event log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log, starting at 0
    pub seq: u64,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    pub message: String,

    /// Assigned at append time; never earlier than the previous entry
    pub timestamp: DateTime<Utc>,
}

/// Append-only, session-scoped record of operator-visible events.
///
/// There is no cap and no dedup. Each append is also published to
/// subscribers (see [`EventLog::subscribe`]) and mirrored to tracing.
pub struct EventLog {
    entries: RwLock<Vec<LogEntry>>,
    notify: broadcast::Sender<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            entries: RwLock::new(Vec::new()),
            notify,
        }
    }

    /// Append an entry stamped with the current time
    pub fn append(&self, kind: EntryKind, message: impl Into<String>) -> LogEntry {
        self.append_at(kind, message.into(), Utc::now())
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.append(EntryKind::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> LogEntry {
        self.append(EntryKind::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> LogEntry {
        self.append(EntryKind::Error, message)
    }

    fn append_at(&self, kind: EntryKind, message: String, now: DateTime<Utc>) -> LogEntry {
        let entry = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let timestamp = match entries.last() {
                Some(last) if last.timestamp > now => last.timestamp,
                _ => now,
            };
            let entry = LogEntry {
                seq: entries.len() as u64,
                kind,
                message,
                timestamp,
            };
            entries.push(entry.clone());
            entry
        };

        match entry.kind {
            EntryKind::Error => warn!(seq = entry.seq, "{}", entry.message),
            _ => info!(seq = entry.seq, kind = ?entry.kind, "{}", entry.message),
        }

        // No subscribers is fine
        let _ = self.notify.send(entry.clone());
        entry
    }

    /// Snapshot of the full ordered log
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.clone()
    }

    /// Entries with `seq >= from`
    pub fn since(&self, from: u64) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(entries.len());
        entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every entry appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.notify.subscribe()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
