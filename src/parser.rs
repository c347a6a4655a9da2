//! Structured log parsers and format detection.
//!
//! A parser turns the text of one physical line into a [`LogEntry`]. Parsers are
//! stateless and never fail: content they cannot understand degrades to a raw entry
//! whose message is the whole line. The engine picks one parser per opened file with
//! [`detect_format`].

pub mod detect;
pub mod json;
pub mod pattern;
pub mod raw;
pub mod timestamp;

use crate::entry::LogEntry;

pub use detect::{detect_format, FormatTemplate, BUILTIN_TEMPLATES};
pub use json::JsonParser;
pub use pattern::PatternParser;
pub use raw::RawParser;
pub use timestamp::parse_timestamp;

/// Capability shared by every parser variant
pub trait LogParser: Send + Sync + std::fmt::Debug {
    /// Human-readable parser name (shown by callers, logged on open)
    fn name(&self) -> &str;

    /// Parse one line of text (already stripped of its terminator)
    fn parse(&self, index: u64, raw: String) -> LogEntry;
}
