//! File handling with memory mapping and an append-only line offset table.
//!
//! This module provides the byte-level layer of the engine: the one-pass
//! [`LineIndex`] scanner, the [`LineStore`] that serves line text from the mapped file
//! (or straight from disk for bytes appended after mapping), and open-time validation.

pub mod line_index;
pub mod line_store;
pub mod validation;

pub use line_index::LineIndex;
pub use line_store::LineStore;
pub use validation::validate_file_path;
