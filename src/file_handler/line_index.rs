//! SIMD-optimized line offset table
//!
//! This module provides the LineIndex structure that records the byte offset where every
//! line of a file starts. The table is built by one pass over the bytes (memchr for
//! SIMD-optimized newline detection) and afterwards only ever grows at the end, when the
//! tail monitor feeds it the bytes a writer appended.

use memchr::memchr_iter;
use std::sync::atomic::{AtomicBool, Ordering};

/// Byte offsets of every line start in a file
///
/// The table never contains a phantom entry for the empty "line" after a terminating
/// newline: `"a\nb\n"` has two lines, `"a\nb"` has two lines, `""` has none. An
/// unterminated last line is a real line whose end is the current end of the indexed bytes.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets where each line starts
    ///
    /// - line_offsets[0] = 0 whenever the file is non-empty
    /// - line_offsets[n] = byte position after the nth newline
    /// - strictly increasing, append-only
    line_offsets: Vec<u64>,

    /// How far into the file we've indexed (in bytes)
    ///
    /// Everything before this position has been scanned for newlines.
    /// Used to resume indexing from where we left off.
    indexed_to_byte: u64,

    /// Whether the next indexed byte begins a new line
    ///
    /// True for an empty index and after a terminating newline; false while the last
    /// line is still open (no newline seen yet).
    at_line_start: bool,
}

impl LineIndex {
    /// Create a new empty line index
    pub fn new() -> Self {
        Self {
            line_offsets: Vec::new(),
            indexed_to_byte: 0,
            at_line_start: true,
        }
    }

    /// Build the index for `data` in one pass
    ///
    /// # Arguments
    /// * `data` - The bytes to scan (normally the memory-mapped file)
    /// * `granularity` - Bytes consumed between two progress reports
    /// * `progress` - Receives the consumed fraction in `[0, 1]`, once per chunk and once at completion
    /// * `cancel` - Checked between chunks; a set flag abandons the scan
    ///
    /// # Returns
    /// * None if the scan was cancelled
    pub fn scan(
        data: &[u8],
        granularity: u64,
        progress: Option<&(dyn Fn(f64) + Send + Sync)>,
        cancel: Option<&AtomicBool>,
    ) -> Option<Self> {
        let mut index = Self::new();
        let chunk_size = granularity.max(1).min(usize::MAX as u64) as usize;
        let total = data.len() as f64;

        for chunk in data.chunks(chunk_size) {
            if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
                return None;
            }
            index.extend(chunk);
            if let Some(report) = progress {
                if index.indexed_to_byte < data.len() as u64 {
                    report(index.indexed_to_byte as f64 / total);
                }
            }
        }

        if let Some(report) = progress {
            report(1.0);
        }
        Some(index)
    }

    /// Index the next bytes of the file
    ///
    /// `chunk` must be the bytes immediately following [`indexed_byte_count`](Self::indexed_byte_count).
    /// Chunks may split lines anywhere; the result is the same as scanning the
    /// concatenation in one call.
    pub fn extend(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        let base = self.indexed_to_byte;
        if self.at_line_start {
            self.line_offsets.push(base);
        }

        for newline in memchr_iter(b'\n', chunk) {
            let next = newline + 1;
            // A newline at the very end only opens a line once more bytes arrive
            if next < chunk.len() {
                self.line_offsets.push(base + next as u64);
            }
        }

        self.at_line_start = chunk.last() == Some(&b'\n');
        self.indexed_to_byte = base + chunk.len() as u64;
    }

    /// Byte range `[start, end)` of a line, including its line terminator
    pub fn get_line_range(&self, line_number: u64) -> Option<(u64, u64)> {
        let idx = usize::try_from(line_number).ok()?;
        let start = *self.line_offsets.get(idx)?;
        let end = self
            .line_offsets
            .get(idx + 1)
            .copied()
            .unwrap_or(self.indexed_to_byte);
        Some((start, end))
    }

    /// The last line, if it has no terminating newline yet
    ///
    /// Such a line grows in place when the writer appends more bytes.
    pub fn open_line(&self) -> Option<u64> {
        if self.at_line_start {
            None
        } else {
            self.indexed_line_count().checked_sub(1)
        }
    }

    /// Line start offsets that have been indexed
    pub fn get_line_offsets(&self) -> &[u64] {
        &self.line_offsets
    }

    /// Number of lines with known positions
    pub fn indexed_line_count(&self) -> u64 {
        self.line_offsets.len() as u64
    }

    /// Byte position up to which we've scanned for newlines
    pub fn indexed_byte_count(&self) -> u64 {
        self.indexed_to_byte
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}
