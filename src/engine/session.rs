//! Everything that belongs to one opened file.
//!
//! A [`Session`] owns the mapping, the detected parser, the search index and the single
//! lock over the line index, the filtered view and the active query. Background tasks
//! hold it through an `Arc`; dropping the last reference tears the index store down.

use crate::config::EngineConfig;
use crate::engine::EngineEvent;
use crate::entry::LogEntry;
use crate::error::{LoglensError, Result};
use crate::file_handler::line_store::decode_line;
use crate::file_handler::{LineIndex, LineStore};
use crate::parser::{detect_format, LogParser};
use crate::query::Query;
use crate::search::filter::{indexed_candidates, stable_line_count, PartialView};
use crate::search::{FilteredView, SearchIndex};
use parking_lot::RwLock;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Lines evaluated per read-lock acquisition while building a view
const SCAN_CHUNK_LINES: u64 = 4096;

/// Receives the fraction of bytes scanned while a file opens
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// State guarded by the session lock
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub index: LineIndex,
    /// `None` when no filter is active
    pub view: Option<FilteredView>,
    pub query: Query,
    pub filter_text: String,
}

impl SessionState {
    /// Filtered count with a filter, total physical count without
    pub fn visible_count(&self) -> u64 {
        match &self.view {
            Some(view) => view.len(),
            None => self.index.indexed_line_count(),
        }
    }

    /// Physical line shown at a logical position
    pub fn physical_line(&self, position: u64, descending: bool) -> Result<u64> {
        let count = self.visible_count();
        if position >= count {
            return Err(LoglensError::PositionOutOfRange { position, count });
        }

        let slot = if descending {
            count - 1 - position
        } else {
            position
        };

        match &self.view {
            Some(view) => view
                .get(slot)
                .ok_or(LoglensError::PositionOutOfRange { position, count }),
            None => Ok(slot),
        }
    }

    fn clear_filter(&mut self, text: &str) {
        self.view = None;
        self.query = Query::match_all();
        self.filter_text = text.to_string();
    }
}

pub(crate) struct Session {
    path: PathBuf,
    store: LineStore,
    parser: Arc<dyn LogParser>,
    state: RwLock<SessionState>,
    search_index: Option<SearchIndex>,
    /// Lines present at open; the bulk loader indexes exactly these
    initial_lines: u64,
    cancel: Arc<AtomicBool>,
    filter_generation: AtomicU64,
    events: broadcast::Sender<EngineEvent>,
}

impl Session {
    /// Map, scan, detect the format and create the search index
    ///
    /// Runs on a blocking thread. Returns `None` if `cancel` was raised mid-scan.
    pub fn open(
        path: PathBuf,
        config: &EngineConfig,
        progress: Option<ProgressFn>,
        cancel: Arc<AtomicBool>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Result<Option<Self>> {
        let store = LineStore::open(&path)?;

        let Some(index) = LineIndex::scan(
            store.mapped_bytes(),
            config.progress_granularity,
            progress.as_deref(),
            Some(&*cancel),
        ) else {
            log::debug!("Scan of {} cancelled", path.display());
            return Ok(None);
        };

        let samples = sample_lines(&store, &index, config.sample_lines);
        let parser = detect_format(&samples);

        let search_index = if config.search_index {
            let location = SearchIndex::location(&path, config.index_dir.as_deref());
            match SearchIndex::create(location) {
                Ok(search_index) => Some(search_index),
                Err(e) => {
                    log::warn!("Search index disabled for {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let initial_lines = index.indexed_line_count();
        log::info!(
            "Opened {} ({} bytes, {} lines, parser {})",
            path.display(),
            store.mapped_len(),
            initial_lines,
            parser.name()
        );

        Ok(Some(Self {
            path,
            store,
            parser,
            state: RwLock::new(SessionState {
                index,
                ..SessionState::default()
            }),
            search_index,
            initial_lines,
            cancel,
            filter_generation: AtomicU64::new(0),
            events,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parser(&self) -> &dyn LogParser {
        self.parser.as_ref()
    }

    pub fn state(&self) -> &RwLock<SessionState> {
        &self.state
    }

    pub fn search_index(&self) -> Option<&SearchIndex> {
        self.search_index.as_ref()
    }

    pub fn initial_lines(&self) -> u64 {
        self.initial_lines
    }

    pub fn events(&self) -> &broadcast::Sender<EngineEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Text of a physical line
    pub fn raw_line(&self, line: u64) -> Result<String> {
        let state = self.state.read();
        let count = state.index.indexed_line_count();
        if line >= count {
            return Err(LoglensError::PositionOutOfRange {
                position: line,
                count,
            });
        }
        self.store.read_line(&state.index, line)
    }

    /// Read a line through an index the caller already holds the lock for
    pub fn read_line(&self, index: &LineIndex, line: u64) -> Result<String> {
        self.store.read_line(index, line)
    }

    /// Parsed entry at a logical position
    pub fn entry(&self, position: u64, descending: bool) -> Result<LogEntry> {
        let (line, text) = {
            let state = self.state.read();
            let line = state.physical_line(position, descending)?;
            (line, self.store.read_line(&state.index, line)?)
        };
        Ok(self.parser.parse(line, text))
    }

    /// Replace the active filter
    ///
    /// The view is built outside the write lock in chunks, then lines that arrived (or
    /// were still open) in the meantime are evaluated and the view, query and text are
    /// committed together under the write lock. A newer call supersedes an older one
    /// still in flight.
    pub fn apply_filter(&self, text: &str) -> Result<()> {
        let generation = self.filter_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let query = Query::parse(text);

        if query.is_match_all() {
            self.state.write().clear_filter(text.trim());
            return Ok(());
        }

        let partial = match self.indexed_view(&query)? {
            Some(partial) => partial,
            None => match self.scanned_view(&query, generation)? {
                Some(partial) => partial,
                None => return Ok(()),
            },
        };

        let mut guard = self.state.write();
        if self.filter_generation.load(Ordering::Acquire) != generation || self.is_cancelled() {
            return Ok(());
        }

        let state = &mut *guard;
        let PartialView {
            mut view,
            resume_from,
        } = partial;
        view.extend_matching(
            &self.store,
            &state.index,
            self.parser.as_ref(),
            &query,
            resume_from..state.index.indexed_line_count(),
        )?;

        log::debug!("Filter {:?} matched {} lines", text, view.len());
        state.view = Some(view);
        state.query = query;
        state.filter_text = text.to_string();
        Ok(())
    }

    fn indexed_view(&self, query: &Query) -> Result<Option<PartialView>> {
        let Some(search_index) = self.search_index.as_ref() else {
            return Ok(None);
        };
        let state = self.state.read();
        indexed_candidates(
            search_index,
            &self.store,
            &state.index,
            self.parser.as_ref(),
            query,
        )
    }

    /// Linear scan over the stable lines; `None` when superseded or closed
    fn scanned_view(&self, query: &Query, generation: u64) -> Result<Option<PartialView>> {
        let mut view = FilteredView::default();
        let mut next = 0;

        loop {
            if self.is_cancelled() || self.filter_generation.load(Ordering::Acquire) != generation
            {
                return Ok(None);
            }

            let state = self.state.read();
            let stable = stable_line_count(&state.index);
            if next >= stable {
                return Ok(Some(PartialView {
                    view,
                    resume_from: next,
                }));
            }

            let end = stable.min(next + SCAN_CHUNK_LINES);
            view.extend_matching(
                &self.store,
                &state.index,
                self.parser.as_ref(),
                query,
                next..end,
            )?;
            next = end;
        }
    }

    /// Ingest bytes appended since the last look
    ///
    /// Runs entirely under the write lock: extends the line index, re-reads a previously
    /// open last line together with the new ones, evaluates them against the active
    /// filter, writes them to the search index and finally raises one `Updated` event.
    /// A file that did not grow (or shrank) is left alone.
    ///
    /// # Returns
    /// * The number of lines added
    pub fn apply_growth(&self) -> Result<u64> {
        if self.is_cancelled() {
            return Ok(0);
        }

        let file_len = std::fs::metadata(&self.path)
            .map_err(|e| LoglensError::file_error("Failed to stat followed file", e))?
            .len();

        let mut guard = self.state.write();
        let state = &mut *guard;

        let known = state.index.indexed_byte_count();
        if file_len <= known {
            return Ok(0);
        }

        let lines_before = state.index.indexed_line_count();
        let reopened = state.index.open_line();
        let (first_line, read_from) = match reopened.and_then(|line| {
            state
                .index
                .get_line_range(line)
                .map(|(start, _)| (line, start))
        }) {
            Some(open) => open,
            None => (lines_before, known),
        };

        let bytes = read_span(&self.path, read_from, file_len)?;
        let already_indexed = (known - read_from) as usize;
        if bytes.len() <= already_indexed {
            return Ok(0);
        }
        state.index.extend(&bytes[already_indexed..]);

        let line_count = state.index.indexed_line_count();
        let mut batch = Vec::with_capacity((line_count - first_line) as usize);
        for line in first_line..line_count {
            let Some((start, end)) = state.index.get_line_range(line) else {
                continue;
            };
            let text = decode_line(&bytes[(start - read_from) as usize..(end - read_from) as usize]);

            if let Some(view) = state.view.as_mut() {
                if Some(line) == reopened {
                    view.retract(line);
                }
                if state.query.is_match(&self.parser.parse(line, text.clone())) {
                    view.push(line);
                }
            }
            batch.push((line, text));
        }

        if let Some(search_index) = &self.search_index {
            if let Err(e) = search_index.upsert_batch(&batch) {
                log::warn!("Failed to index appended lines: {}", e);
                search_index.mark_incomplete();
            }
        }
        drop(guard);

        let added = line_count - lines_before;
        log::debug!(
            "{} grew to {} bytes: {} new lines",
            self.path.display(),
            file_len,
            added
        );
        // A reopen may have superseded this session while it was ingesting
        if !self.is_cancelled() {
            // No subscribers is fine
            let _ = self.events.send(EngineEvent::Updated);
        }
        Ok(added)
    }
}

/// Up to `count` non-blank lines from the start of the file
fn sample_lines(store: &LineStore, index: &LineIndex, count: usize) -> Vec<String> {
    let mut samples = Vec::with_capacity(count);
    for line in 0..index.indexed_line_count() {
        if samples.len() >= count {
            break;
        }
        match store.read_line(index, line) {
            Ok(text) if !text.trim().is_empty() => samples.push(text),
            Ok(_) => {}
            Err(e) => {
                log::debug!("Stopped sampling at line {}: {}", line, e);
                break;
            }
        }
    }
    samples
}

/// Read `[start, end)` through a fresh handle; a file that shrank meanwhile yields less
fn read_span(path: &Path, start: u64, end: u64) -> Result<Vec<u8>> {
    let mut file = File::open(path)
        .map_err(|e| LoglensError::file_error("Failed to open followed file", e))?;
    file.seek(SeekFrom::Start(start))
        .map_err(|e| LoglensError::file_error("Failed to seek followed file", e))?;

    let mut buffer = Vec::with_capacity((end - start) as usize);
    file.take(end - start)
        .read_to_end(&mut buffer)
        .map_err(|e| LoglensError::file_error("Failed to read appended bytes", e))?;
    Ok(buffer)
}
