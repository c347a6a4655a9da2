//! Pass-through parser for unstructured text.

use crate::entry::LogEntry;
use crate::parser::LogParser;

/// The whole line becomes the message; nothing else is extracted
#[derive(Debug, Clone, Copy, Default)]
pub struct RawParser;

impl LogParser for RawParser {
    fn name(&self) -> &str {
        "Raw"
    }

    fn parse(&self, index: u64, raw: String) -> LogEntry {
        LogEntry::raw(index, raw)
    }
}
