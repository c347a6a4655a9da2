//! Regex parser with named capture groups.
//!
//! The groups `timestamp`, `level` and `message` fill the dedicated entry attributes;
//! every other named group lands in `fields`. Lines that do not match degrade to raw
//! entries.

use crate::entry::LogEntry;
use crate::error::{LoglensError, Result};
use crate::parser::timestamp::parse_timestamp;
use crate::parser::LogParser;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::HashMap;

const RESERVED_GROUPS: &[&str] = &["timestamp", "level", "message"];

/// Parser driven by a compiled pattern and a timestamp format
#[derive(Debug, Clone)]
pub struct PatternParser {
    name: String,
    regex: Regex,
    /// chrono format string for the `timestamp` group
    timestamp_format: String,
    /// Named groups other than the reserved ones
    extra_groups: Vec<String>,
}

impl PatternParser {
    /// Compile a parser
    ///
    /// # Errors
    /// * `InvalidArgument` if the pattern does not compile
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        timestamp_format: impl Into<String>,
    ) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| LoglensError::InvalidArgument {
            message: format!("Invalid log pattern: {}", e),
        })?;

        let extra_groups = regex
            .capture_names()
            .flatten()
            .filter(|name| !RESERVED_GROUPS.contains(name))
            .map(str::to_string)
            .collect();

        Ok(Self {
            name: name.into(),
            regex,
            timestamp_format: timestamp_format.into(),
            extra_groups,
        })
    }

    /// Whether the pattern matches a line
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    fn parse_timestamp(&self, text: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(text, &self.timestamp_format)
            .map(|dt| dt.and_utc())
            .ok()
            .or_else(|| parse_timestamp(text))
    }
}

impl LogParser for PatternParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, index: u64, raw: String) -> LogEntry {
        let (timestamp, level, message, fields) = {
            let Some(caps) = self.regex.captures(&raw) else {
                return LogEntry::raw(index, raw);
            };

            let timestamp = caps
                .name("timestamp")
                .and_then(|m| self.parse_timestamp(m.as_str()));
            let level = caps.name("level").map(|m| m.as_str().to_string());
            let message = caps
                .name("message")
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| raw.clone());

            let fields: HashMap<String, String> = self
                .extra_groups
                .iter()
                .filter_map(|group| {
                    caps.name(group)
                        .map(|m| (group.clone(), m.as_str().to_string()))
                })
                .collect();

            (timestamp, level, message, fields)
        };

        LogEntry {
            index,
            timestamp,
            level,
            message: Some(message),
            fields: (!fields.is_empty()).then_some(fields),
            raw_content: raw,
        }
    }
}
