//! SQLite FTS5 store of line text keyed by physical line number.

use crate::error::{LoglensError, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const INDEX_SUFFIX: &str = ".idx.db";

const SETUP_SQL: &str = "
    PRAGMA journal_mode = OFF;
    PRAGMA synchronous = OFF;
    CREATE VIRTUAL TABLE log_index USING fts5(content);
";

const DELETE_LINE_SQL: &str = "DELETE FROM log_index WHERE rowid = ?1";
const INSERT_LINE_SQL: &str = "INSERT INTO log_index (rowid, content) VALUES (?1, ?2)";
const SEARCH_SQL: &str = "SELECT rowid FROM log_index WHERE log_index MATCH ?1 ORDER BY rowid";

/// Full-text index for one open file
///
/// The store lives next to the log file (or in a configured directory), is recreated on
/// every open and deleted when dropped. The rowid of each row is the physical line
/// number, so re-indexing a line replaces it.
#[derive(Debug)]
pub struct SearchIndex {
    path: PathBuf,

    /// `None` once dropped, so the file can be removed after the handle closes
    connection: Mutex<Option<Connection>>,

    /// The background bulk load is running
    indexing: AtomicBool,

    /// Every indexed line is present; cleared by any failed write
    ready: AtomicBool,
}

impl SearchIndex {
    /// Where the store for `log_path` goes: `<dir>/<file name>.idx.db`
    pub fn location(log_path: &Path, index_dir: Option<&Path>) -> PathBuf {
        let mut name = log_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "log".into());
        name.push(INDEX_SUFFIX);

        match index_dir {
            Some(dir) => dir.join(name),
            None => log_path.with_file_name(name),
        }
    }

    /// Create an empty store at `path`, replacing whatever was there
    ///
    /// The new index reports [`is_indexing`](Self::is_indexing) until
    /// [`finish_indexing`](Self::finish_indexing) is called.
    pub fn create(path: PathBuf) -> Result<Self> {
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed stale search index {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(LoglensError::file_error(
                    format!("Failed to remove stale search index: {}", path.display()),
                    e,
                ))
            }
        }

        let connection = Connection::open(&path)?;
        connection.execute_batch(SETUP_SQL)?;

        Ok(Self {
            path,
            connection: Mutex::new(Some(connection)),
            indexing: AtomicBool::new(true),
            ready: AtomicBool::new(false),
        })
    }

    /// Location of the store on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True while the background bulk load is running
    pub fn is_indexing(&self) -> bool {
        self.indexing.load(Ordering::Acquire)
    }

    /// True when searches can be answered from the index
    pub fn is_ready(&self) -> bool {
        !self.is_indexing() && self.ready.load(Ordering::Acquire)
    }

    /// End the bulk load; a failed load leaves the index unusable for the session
    pub fn finish_indexing(&self, complete: bool) {
        self.ready.store(complete, Ordering::Release);
        self.indexing.store(false, Ordering::Release);
    }

    /// Stop answering searches, e.g. after a line could not be written
    pub fn mark_incomplete(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Insert or replace `(line, text)` rows in one transaction
    pub fn upsert_batch(&self, lines: &[(u64, String)]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut guard = self.connection.lock();
        let connection = guard
            .as_mut()
            .ok_or_else(|| LoglensError::index("Search index is closed"))?;
        let tx = connection.transaction()?;

        {
            let mut delete = tx.prepare_cached(DELETE_LINE_SQL)?;
            let mut insert = tx.prepare_cached(INSERT_LINE_SQL)?;
            for (line, text) in lines {
                let rowid = i64::try_from(*line).unwrap_or(i64::MAX);
                delete.execute(params![rowid])?;
                insert.execute(params![rowid, text])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Physical lines containing `text` as a phrase, ascending
    ///
    /// The whole text is searched as one quoted FTS5 phrase with embedded quotes doubled,
    /// so no query syntax leaks through.
    pub fn search_phrase(&self, text: &str) -> Result<Vec<u64>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let phrase = format!("\"{}\"", text.replace('"', "\"\""));

        let guard = self.connection.lock();
        let connection = guard
            .as_ref()
            .ok_or_else(|| LoglensError::index("Search index is closed"))?;

        let mut stmt = connection.prepare_cached(SEARCH_SQL)?;
        let rows = stmt.query_map(params![phrase], |row| row.get::<_, i64>(0))?;

        let mut lines = Vec::new();
        for row in rows {
            if let Ok(line) = u64::try_from(row?) {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    /// Number of indexed rows
    pub fn row_count(&self) -> Result<u64> {
        let guard = self.connection.lock();
        let connection = guard
            .as_ref()
            .ok_or_else(|| LoglensError::index("Search index is closed"))?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM log_index", [], |row| {
            row.get(0)
        })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl Drop for SearchIndex {
    fn drop(&mut self) {
        // Close the handle first; some platforms refuse to delete open files
        drop(self.connection.lock().take());
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Deleted search index {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to delete search index {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
