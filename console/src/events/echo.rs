//! Terminal rendering of event log entries

use chrono::Local;
use colored::Colorize;

use crate::events::log::{EntryKind, LogEntry};

/// Render an entry as `HH:MM:SS message`, coloured by kind
pub fn render_entry(entry: &LogEntry) -> String {
    let time = entry
        .timestamp
        .with_timezone(&Local)
        .format("%H:%M:%S")
        .to_string();
    let message = match entry.kind {
        EntryKind::Info => entry.message.normal(),
        EntryKind::Success => entry.message.green(),
        EntryKind::Error => entry.message.red(),
    };
    format!("{} {}", time.dimmed(), message)
}
