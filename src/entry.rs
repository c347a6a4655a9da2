//! The structured view of a single physical line.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

/// One log line as produced by a [`LogParser`](crate::parser::LogParser).
///
/// Entries are recomputed on every access and never cached by the engine, so they
/// always reflect the current bytes of the line (a partial trailing line that the
/// writer later completes yields a different entry on the next read).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogEntry {
    /// Physical line number (0-based)
    pub index: u64,

    /// Line text with trailing `\r`/`\n` removed
    pub raw_content: String,

    pub timestamp: Option<DateTime<Utc>>,
    pub level: Option<String>,
    pub message: Option<String>,

    /// Flattened structured fields (`a.b`, `a[0]`) with stringified scalar values
    pub fields: Option<HashMap<String, String>>,
}

impl LogEntry {
    /// A raw entry: the whole line is the message, nothing else is known
    pub fn raw(index: u64, raw_content: impl Into<String>) -> Self {
        let raw_content = raw_content.into();
        Self {
            index,
            message: Some(raw_content.clone()),
            raw_content,
            ..Self::default()
        }
    }

    /// Look up a flattened field by its exact path
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .as_ref()
            .and_then(|fields| fields.get(name))
            .map(String::as_str)
    }

    /// Timestamp formatted as RFC 3339 in UTC, the form field queries compare against
    pub fn timestamp_string(&self) -> Option<String> {
        self.timestamp
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}
