//! File validation utilities for ensuring files are suitable for processing.
//!
//! This module provides validation functions to check that files can be safely
//! opened by the engine before any mapping or scanning starts.

use crate::error::{LoglensError, Result};
use std::fs::File;
use std::path::Path;

/// Largest file the engine agrees to open (1 TiB)
const MAX_REASONABLE_SIZE: u64 = 1024 * 1024 * 1024 * 1024;

/// Validate that a file path is accessible and suitable for processing
///
/// # Validations Performed
/// - Path exists and is a regular file (not a directory)
/// - File is readable by the current process
/// - File size is not absurdly large for a log file
///
/// Empty files are accepted: a log that has just been created is a normal thing to follow.
///
/// # Error Cases
/// - `FileNotFound` when the path does not exist
/// - `NotAFile` for directories and other non-regular files
/// - `PermissionDenied` when the file cannot be opened for reading
/// - `FileError` for other metadata/open failures and oversized files
pub fn validate_file_path(path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoglensError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(LoglensError::file_error("Failed to read file metadata", e)),
    };

    if !metadata.is_file() {
        return Err(LoglensError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let file_size = metadata.len();
    if file_size > MAX_REASONABLE_SIZE {
        return Err(LoglensError::file_error(
            format!(
                "File is suspiciously large ({}GB): {}",
                file_size / (1024 * 1024 * 1024),
                path.display()
            ),
            std::io::Error::new(std::io::ErrorKind::InvalidData, "File too large"),
        ));
    }

    // Try to open the file to verify read permissions
    match File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(LoglensError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(LoglensError::file_error("Cannot open file for reading", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    /// Create a test file with specific content
    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content)
            .expect("Failed to write test content");
        file.flush().expect("Failed to flush test file");
        file
    }

    #[test]
    fn test_validate_valid_file() {
        let test_file = create_test_file(b"This is valid log content\nLine 2\nLine 3\n");
        assert!(validate_file_path(test_file.path()).is_ok());
    }

    #[test]
    fn test_validate_empty_file_is_accepted() {
        let empty_file = create_test_file(&[]);
        assert!(validate_file_path(empty_file.path()).is_ok());
    }

    #[test]
    fn test_validate_nonexistent_file() {
        let non_existent = Path::new("/this/file/does/not/exist.log");
        match validate_file_path(non_existent) {
            Err(LoglensError::FileNotFound { path }) => assert_eq!(path, non_existent),
            other => panic!("Expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        match validate_file_path(temp_dir.path()) {
            Err(LoglensError::NotAFile { .. }) => {}
            other => panic!("Expected NotAFile for directory, got {other:?}"),
        }
    }
}
