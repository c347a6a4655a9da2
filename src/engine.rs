//! The composition root callers build on.
//!
//! [`LogEngine`] opens one file at a time and exposes everything a viewer needs:
//! line counts, entries at logical positions (after filtering and ordering), filter
//! text, follow mode and the ordering flag. Heavy work (the initial scan, building a
//! filter, the search-index load, growth handling) runs on tokio's blocking pool;
//! changes are announced on a broadcast channel obtained from [`LogEngine::subscribe`].

mod indexer;
mod session;
mod tail;

use crate::config::EngineConfig;
use crate::entry::LogEntry;
use crate::error::{LoglensError, Result};
use crate::file_handler::validate_file_path;
use session::Session;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tail::TailHandle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub use session::ProgressFn;

const EVENT_CAPACITY: usize = 64;

/// Notifications raised by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Follow mode ingested appended bytes
    Updated,
    /// The background search-index load finished (successfully or not)
    IndexingCompleted,
}

/// One opened file plus the tasks working on it
struct OpenFile {
    session: Arc<Session>,
    indexer: Option<JoinHandle<()>>,
    tail: Option<TailHandle>,
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        // Background tasks notice on their next check and release the session
        self.session.cancel();
    }
}

/// Line-addressable view over one log file
pub struct LogEngine {
    config: EngineConfig,
    current: Option<OpenFile>,
    events: broadcast::Sender<EngineEvent>,
    following: bool,
    descending: bool,
}

impl LogEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            following: config.follow,
            config,
            current: None,
            events,
            descending: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a file, replacing whatever was open
    ///
    /// # Errors
    /// * `FileNotFound`, `NotAFile`, `PermissionDenied` for unusable paths
    /// * `FileError` / `MemoryMappingError` if the file cannot be read
    ///
    /// On error the engine is left with no file open.
    pub async fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.open_with_progress(path, None).await
    }

    /// Like [`open`](Self::open), reporting the scanned fraction to `progress`
    pub async fn open_with_progress(
        &mut self,
        path: impl AsRef<Path>,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        self.close().await;

        let path = path.as_ref().to_path_buf();
        validate_file_path(&path)?;

        let cancel = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop(Some(Arc::clone(&cancel)));
        let config = self.config.clone();
        let events = self.events.clone();

        let opened = tokio::task::spawn_blocking(move || {
            Session::open(path, &config, progress, cancel, events)
        })
        .await
        .map_err(|e| LoglensError::other(format!("Open task failed: {}", e)))??;
        guard.disarm();

        let session = Arc::new(
            opened.ok_or_else(|| LoglensError::other("Open was cancelled"))?,
        );

        let indexer = session.search_index().map(|_| {
            tokio::spawn(indexer::index_worker(
                Arc::clone(&session),
                self.config.index_batch_size,
            ))
        });

        let tail = self.following.then(|| self.spawn_tail(&session));

        self.current = Some(OpenFile {
            session,
            indexer,
            tail,
        });
        Ok(())
    }

    /// Close the open file, stopping its background tasks and deleting its index store
    pub async fn close(&mut self) {
        let Some(mut open) = self.current.take() else {
            return;
        };

        open.session.cancel();
        if let Some(tail) = open.tail.take() {
            tail.shutdown().await;
        }
        if let Some(indexer) = open.indexer.take() {
            if let Err(e) = indexer.await {
                log::warn!("Indexing task failed: {}", e);
            }
        }
        log::debug!("Closed {}", open.session.path().display());
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.session().map(|session| session.path())
    }

    /// Name of the parser picked for the open file
    pub fn parser_name(&self) -> Option<&str> {
        self.session().map(|session| session.parser().name())
    }

    /// Visible lines: the filtered count with a filter, every physical line without
    pub fn line_count(&self) -> u64 {
        self.session()
            .map_or(0, |session| session.state().read().visible_count())
    }

    /// Physical lines known so far, ignoring the filter
    pub fn total_lines(&self) -> u64 {
        self.session().map_or(0, |session| {
            session.state().read().index.indexed_line_count()
        })
    }

    /// Parsed entry at a logical position in `[0, line_count)`
    ///
    /// # Errors
    /// * `NoFileOpen` without a file
    /// * `PositionOutOfRange` past the visible count
    pub fn entry(&self, position: u64) -> Result<LogEntry> {
        self.session()
            .ok_or(LoglensError::NoFileOpen)?
            .entry(position, self.descending)
    }

    /// Text of a physical line, bypassing filter and ordering
    pub fn raw_line(&self, line: u64) -> Result<String> {
        self.session()
            .ok_or(LoglensError::NoFileOpen)?
            .raw_line(line)
    }

    /// Replace the active filter; blank text removes it
    pub async fn set_filter(&self, text: &str) -> Result<()> {
        let session = Arc::clone(self.session().ok_or(LoglensError::NoFileOpen)?);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || session.apply_filter(&text))
            .await
            .map_err(|e| LoglensError::other(format!("Filter task failed: {}", e)))?
    }

    /// The filter text currently applied
    pub fn filter_text(&self) -> String {
        self.session()
            .map(|session| session.state().read().filter_text.clone())
            .unwrap_or_default()
    }

    /// Turn follow mode on or off
    ///
    /// The setting persists across opens. Turning it off lets a growth check already
    /// running finish before returning.
    pub async fn set_follow_enabled(&mut self, enabled: bool) {
        self.following = enabled;

        let Some(open) = self.current.as_ref() else {
            return;
        };
        match (enabled, open.tail.is_some()) {
            (true, false) => {
                let tail = self.spawn_tail(&open.session);
                if let Some(open) = self.current.as_mut() {
                    open.tail = Some(tail);
                }
            }
            (false, true) => {
                if let Some(tail) = self.current.as_mut().and_then(|open| open.tail.take()) {
                    tail.shutdown().await;
                }
            }
            _ => {}
        }
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Present entries newest first; the filter and counts are unaffected
    pub fn set_descending(&mut self, descending: bool) {
        self.descending = descending;
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    /// True while the search index is still being loaded
    pub fn is_indexing(&self) -> bool {
        self.session()
            .and_then(|session| session.search_index())
            .is_some_and(|search_index| search_index.is_indexing())
    }

    /// Receive [`EngineEvent`]s; the receiver stays valid across reopen
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn session(&self) -> Option<&Arc<Session>> {
        self.current.as_ref().map(|open| &open.session)
    }

    fn spawn_tail(&self, session: &Arc<Session>) -> TailHandle {
        TailHandle::spawn(
            Arc::clone(session),
            self.config.settle_delay,
            self.config.poll_interval,
        )
    }
}

impl Default for LogEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Aborts the scan of an open whose future was dropped before it finished
struct CancelOnDrop(Option<Arc<AtomicBool>>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(flag) = self.0.take() {
            flag.store(true, Ordering::Release);
        }
    }
}
