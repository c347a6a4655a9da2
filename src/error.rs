//! Error types and handling infrastructure for loglens.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary layers `anyhow` on top for context.
//!
//! Most failure modes inside the engine degrade gracefully (malformed JSON becomes a raw
//! entry, an unusable search index falls back to a linear scan, a transient stat failure
//! while tailing waits for the next growth signal). Only opening a file and reading lines
//! that are genuinely unreadable surface as errors.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for loglens operations.
#[derive(Error, Debug)]
pub enum LoglensError {
    /// File system related errors (file not found, permission denied, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Permission denied accessing file
    #[error("Permission denied accessing file: {path}")]
    PermissionDenied { path: PathBuf },

    /// Memory mapping related errors
    #[error("Memory mapping failed: {message}")]
    MemoryMappingError { message: String },

    /// Auxiliary search index (SQLite) errors
    #[error("Search index error: {message}")]
    IndexError { message: String },

    /// File system watcher errors
    #[error("File watcher error: {message}")]
    WatchError { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// An operation that needs an open file was called with nothing loaded
    #[error("No file is open")]
    NoFileOpen,

    /// Logical position outside `[0, line_count)`
    #[error("Position {position} out of range (line count {count})")]
    PositionOutOfRange { position: u64, count: u64 },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for loglens operations.
pub type Result<T> = std::result::Result<T, LoglensError>;

impl LoglensError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a MemoryMappingError with a descriptive message
    pub fn memory_mapping(message: impl Into<String>) -> Self {
        Self::MemoryMappingError {
            message: message.into(),
        }
    }

    /// Create an IndexError with a descriptive message
    pub fn index(message: impl Into<String>) -> Self {
        Self::IndexError {
            message: message.into(),
        }
    }

    /// Create a WatchError with a descriptive message
    pub fn watch(message: impl Into<String>) -> Self {
        Self::WatchError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// True for errors a tailing reader should treat as "try again on the next signal"
    pub fn is_transient(&self) -> bool {
        match self {
            Self::FileError { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

// Automatic conversion from io::Error to LoglensError
impl From<std::io::Error> for LoglensError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => {
                // The path is lost here; call sites that know it use FileNotFound directly
                Self::FileError {
                    message: "File not found".to_string(),
                    source: err,
                }
            }
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

impl From<rusqlite::Error> for LoglensError {
    fn from(err: rusqlite::Error) -> Self {
        Self::index(err.to_string())
    }
}

impl From<notify::Error> for LoglensError {
    fn from(err: notify::Error) -> Self {
        Self::watch(err.to_string())
    }
}
