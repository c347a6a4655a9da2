//! Memory-mapped line reader with a direct-read path for appended bytes
//!
//! The mapping is fixed at the size the file had when it was opened. Lines that lie
//! (partly) beyond that extent were appended later by a writer; those are served by a
//! fresh file handle that seeks to the range and reads it directly. Which path serves a
//! read is decided by a plain range check, never by catching a failure.

use crate::error::{LoglensError, Result};
use crate::file_handler::line_index::LineIndex;
use bstr::ByteSlice;
use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-only, random-access view of a log file's bytes
///
/// All file handles are opened read-only with the platform's default sharing, which
/// never excludes concurrent writers (on Windows std opens with read, write and delete
/// sharing).
#[derive(Debug)]
pub struct LineStore {
    /// Path used to open fresh handles for the direct-read path
    path: PathBuf,

    /// Memory-mapped file handle, `None` when the file was empty at open time
    ///
    /// Pages are loaded on demand by the OS.
    mmap: Option<Mmap>,
}

impl LineStore {
    /// Map the file as it is right now
    ///
    /// # Performance
    /// * O(1) - Just sets up memory mapping, no file content scanning
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            LoglensError::file_error(format!("Failed to open file: {}", path.display()), e)
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| LoglensError::file_error("Failed to get file metadata", e))?
            .len();

        let mmap = if file_size == 0 {
            None
        } else {
            // SAFETY: the map is read-only; other processes may append, which the
            // fixed-length map never observes
            let mmap = unsafe {
                Mmap::map(&file).map_err(|e| {
                    LoglensError::memory_mapping(format!(
                        "Failed to memory map file {}: {}",
                        path.display(),
                        e
                    ))
                })?
            };

            // The initial scan reads front to back
            #[cfg(unix)]
            {
                if let Err(e) = mmap.advise(memmap2::Advice::Sequential) {
                    log::warn!("Failed to set mmap advice: {}", e);
                }
            }

            Some(mmap)
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The mapped bytes (the file as it was at open time)
    pub fn mapped_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Length of the mapping in bytes
    pub fn mapped_len(&self) -> u64 {
        self.mapped_bytes().len() as u64
    }

    /// Whether `[start, end)` lies entirely inside the mapping
    pub fn is_mapped(&self, start: u64, end: u64) -> bool {
        start <= end && end <= self.mapped_len()
    }

    /// Read a line by physical index through the offsets in `index`
    pub fn read_line(&self, index: &LineIndex, line_number: u64) -> Result<String> {
        let (start, end) = index.get_line_range(line_number).ok_or_else(|| {
            LoglensError::file_error(
                format!("Line number {} out of bounds", line_number),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "Line out of bounds"),
            )
        })?;
        self.read_range(start, end)
    }

    /// Read `[start, end)` and decode it as one line
    ///
    /// Invalid UTF-8 is replaced, trailing `\r`/`\n` are stripped, and an empty range
    /// yields an empty string.
    pub fn read_range(&self, start: u64, end: u64) -> Result<String> {
        if end <= start {
            return Ok(String::new());
        }

        if self.is_mapped(start, end) {
            let bytes = &self.mapped_bytes()[start as usize..end as usize];
            Ok(decode_line(bytes))
        } else {
            self.read_direct(start, end)
        }
    }

    /// Fallback path: fresh handle, seek, read
    fn read_direct(&self, start: u64, end: u64) -> Result<String> {
        let mut file = File::open(&self.path).map_err(|e| {
            LoglensError::file_error(format!("Failed to reopen file: {}", self.path.display()), e)
        })?;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| LoglensError::file_error("Failed to seek to line start", e))?;

        let mut buffer = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buffer)
            .map_err(|e| LoglensError::file_error("Failed to read appended line", e))?;

        Ok(decode_line(&buffer))
    }
}

/// Lossy UTF-8 decode without the line terminator
pub(crate) fn decode_line(bytes: &[u8]) -> String {
    bytes
        .trim_end_with(|c| c == '\r' || c == '\n')
        .to_str_lossy()
        .into_owned()
}
