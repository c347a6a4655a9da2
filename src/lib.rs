//! # loglens - Line-Addressable Log File Engine
//!
//! Open an arbitrarily large, possibly still-growing log file and search, filter and
//! follow it without loading it into memory.
//!
//! ## Features
//!
//! - **Large File Support**: one memchr pass builds a line offset table over a
//!   memory-mapped file; lines are decoded on demand
//! - **Live Tailing**: bytes appended after open are read directly from disk and
//!   ingested under a single lock, so readers never see a half-extended index
//! - **Structured Parsing**: JSON lines (flattened fields), regex templates with named
//!   groups, or raw text, picked automatically from the first lines
//! - **Queries**: free text, `field:value`, `>`/`<` comparisons, `AND`/`OR`/`NOT`
//! - **Search Index**: a background SQLite FTS5 index accelerates plain-text filters
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Engine tunables, optionally loaded from TOML
//! - [`file_handler`] - Line offset table, mapped line store, path validation
//! - [`parser`] - Parser variants and format detection
//! - [`query`] - Query language parsing and evaluation
//! - [`search`] - Full-text index and filtered views
//! - [`engine`] - The [`LogEngine`] composition root

// Core modules
pub mod config;
pub mod entry;
pub mod error;
pub mod file_handler;

// Parsing and querying
pub mod parser;
pub mod query;

// Core components
pub mod engine;
pub mod search;

// Re-export commonly used types for convenience
pub use error::{LoglensError, Result};

// Public API surface for external usage
pub use config::EngineConfig;
pub use engine::{EngineEvent, LogEngine, ProgressFn};
pub use entry::LogEntry;
pub use parser::LogParser;
pub use query::Query;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
