//! Format auto-detection from the first lines of a file.

use crate::parser::{JsonParser, LogParser, PatternParser, RawParser};
use std::sync::Arc;

/// A built-in line layout the detector knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatTemplate {
    pub name: &'static str,
    pub pattern: &'static str,
    /// chrono format for the `timestamp` group
    pub timestamp_format: &'static str,
}

/// Templates tried in order after JSON
pub const BUILTIN_TEMPLATES: &[FormatTemplate] = &[
    // [2024-01-29 15:20:00] INFO: message
    FormatTemplate {
        name: "Standard",
        pattern: r"^\[?(?P<timestamp>\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2})\]?\s+(?P<level>\w+):?\s+(?P<message>.*)$",
        timestamp_format: "%Y-%m-%d %H:%M:%S",
    },
    // 2024-01-29T15:20:00.123Z INFO message
    FormatTemplate {
        name: "ISO",
        pattern: r"^(?P<timestamp>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?)Z?\s+(?P<level>\w+)\s+(?P<message>.*)$",
        timestamp_format: "%Y-%m-%dT%H:%M:%S%.f",
    },
    // 2024-01-29 15:20:00 [INFO] message
    FormatTemplate {
        name: "Bracketed",
        pattern: r"^\[?(?P<timestamp>\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?)\]?\s+\[(?P<level>\w+)\]\s+(?P<message>.*)$",
        timestamp_format: "%Y-%m-%d %H:%M:%S%.f",
    },
];

/// Pick a parser for a file from its first lines
///
/// The first non-blank sample decides: JSON when it starts with `{` and parses as a
/// JSON value, else the first built-in template that matches it, else raw text.
pub fn detect_format<S: AsRef<str>>(samples: &[S]) -> Arc<dyn LogParser> {
    let Some(sample) = samples
        .iter()
        .map(AsRef::as_ref)
        .find(|line| !line.trim().is_empty())
    else {
        return Arc::new(RawParser);
    };

    if sample.trim_start().starts_with('{')
        && serde_json::from_str::<serde_json::Value>(sample).is_ok()
    {
        return Arc::new(JsonParser);
    }

    for template in BUILTIN_TEMPLATES {
        match PatternParser::new(
            format!("Regex ({})", template.name),
            template.pattern,
            template.timestamp_format,
        ) {
            Ok(parser) if parser.is_match(sample) => return Arc::new(parser),
            Ok(_) => {}
            Err(e) => log::warn!("Built-in template {} failed to compile: {}", template.name, e),
        }
    }

    Arc::new(RawParser)
}
