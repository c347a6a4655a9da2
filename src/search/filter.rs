//! The materialised list of physical lines that pass the active query.

use crate::error::Result;
use crate::file_handler::{LineIndex, LineStore};
use crate::parser::LogParser;
use crate::query::Query;
use crate::search::SearchIndex;
use std::ops::Range;

/// Physical line numbers matching the active query, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    lines: Vec<u64>,
}

impl FilteredView {
    pub fn len(&self) -> u64 {
        self.lines.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Physical line at a position of the view
    pub fn get(&self, position: u64) -> Option<u64> {
        usize::try_from(position)
            .ok()
            .and_then(|i| self.lines.get(i))
            .copied()
    }

    pub fn lines(&self) -> &[u64] {
        &self.lines
    }

    pub(crate) fn push(&mut self, line: u64) {
        debug_assert!(self.lines.last().map_or(true, |last| *last < line));
        self.lines.push(line);
    }

    /// Drop `line` if it is the last entry; used when a partial line is re-evaluated
    pub(crate) fn retract(&mut self, line: u64) {
        if self.lines.last() == Some(&line) {
            self.lines.pop();
        }
    }

    /// Parse and evaluate every line in `lines`, appending the matches
    pub(crate) fn extend_matching(
        &mut self,
        store: &LineStore,
        index: &LineIndex,
        parser: &dyn LogParser,
        query: &Query,
        lines: Range<u64>,
    ) -> Result<()> {
        for line in lines {
            if line_matches(store, index, parser, query, line)? {
                self.push(line);
            }
        }
        Ok(())
    }
}

/// A view built up to (not including) `resume_from`
///
/// Lines from `resume_from` on are evaluated under the write lock when the view is
/// committed; that range always includes a still-open last line.
#[derive(Debug, Default)]
pub(crate) struct PartialView {
    pub view: FilteredView,
    pub resume_from: u64,
}

/// Read, parse and evaluate one physical line
pub(crate) fn line_matches(
    store: &LineStore,
    index: &LineIndex,
    parser: &dyn LogParser,
    query: &Query,
    line: u64,
) -> Result<bool> {
    let text = store.read_line(index, line)?;
    Ok(query.is_match(&parser.parse(line, text)))
}

/// Lines below the open line never change, so a view of them can be built off the lock
pub(crate) fn stable_line_count(index: &LineIndex) -> u64 {
    index
        .open_line()
        .unwrap_or_else(|| index.indexed_line_count())
}

/// Answer a bare free-text query from the full-text index
///
/// Returns `None` whenever the linear scan has to run instead: the query is not plain
/// text, the index is still loading or incomplete, the search failed, or no hit survived
/// verification with the evaluator. The caller must hold the session lock so the index
/// and `index` agree.
pub(crate) fn indexed_candidates(
    search_index: &SearchIndex,
    store: &LineStore,
    index: &LineIndex,
    parser: &dyn LogParser,
    query: &Query,
) -> Result<Option<PartialView>> {
    let Some(text) = query.as_full_text() else {
        return Ok(None);
    };
    if text.is_empty() || !search_index.is_ready() {
        return Ok(None);
    }

    let hits = match search_index.search_phrase(text) {
        Ok(hits) => hits,
        Err(e) => {
            log::warn!("Search index query failed, scanning instead: {}", e);
            return Ok(None);
        }
    };
    if hits.is_empty() {
        log::debug!("No index hits for {:?}, scanning instead", text);
        return Ok(None);
    }

    let resume_from = stable_line_count(index);
    let mut view = FilteredView::default();
    for line in hits.into_iter().take_while(|line| *line < resume_from) {
        if line_matches(store, index, parser, query, line)? {
            view.push(line);
        }
    }

    if view.is_empty() {
        log::debug!("No index hit for {:?} survived verification, scanning instead", text);
        return Ok(None);
    }

    log::debug!(
        "Index answered {:?} with {} verified lines",
        text,
        view.len()
    );
    Ok(Some(PartialView { view, resume_from }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawParser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(content: &str) -> (NamedTempFile, LineStore, LineIndex) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        let store = LineStore::open(file.path()).unwrap();
        let index = LineIndex::scan(store.mapped_bytes(), 1024, None, None).unwrap();
        (file, store, index)
    }

    #[test]
    fn test_extend_matching_keeps_file_order() {
        let (_file, store, index) = fixture("Error: a\nInfo: b\nWarning: c\nError: d\n");
        let mut view = FilteredView::default();
        view.extend_matching(&store, &index, &RawParser, &Query::parse("error"), 0..4)
            .unwrap();

        assert_eq!(view.lines(), &[0, 3]);
        assert_eq!(view.get(1), Some(3));
        assert_eq!(view.get(2), None);
    }

    #[test]
    fn test_retract_only_removes_last() {
        let mut view = FilteredView::default();
        view.push(1);
        view.push(4);
        view.retract(1);
        assert_eq!(view.lines(), &[1, 4]);
        view.retract(4);
        assert_eq!(view.lines(), &[1]);
    }

    #[test]
    fn test_stable_count_excludes_open_line() {
        let (_file, _store, index) = fixture("a\nb\npartial");
        assert_eq!(stable_line_count(&index), 2);

        let (_file, _store, index) = fixture("a\nb\n");
        assert_eq!(stable_line_count(&index), 2);
    }

    #[test]
    fn test_indexed_candidates_verifies_hits() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_file, store, index) = fixture("Error: a\nInfo: b\nerror-prone\nError: d\n");
        let search_index = SearchIndex::create(dir.path().join("t.idx.db")).unwrap();
        search_index
            .upsert_batch(&[
                (0, "Error: a".to_string()),
                (1, "Info: b".to_string()),
                (2, "error-prone".to_string()),
                (3, "Error: d".to_string()),
            ])
            .unwrap();

        // Still loading
        let query = Query::parse("Error");
        assert!(indexed_candidates(&search_index, &store, &index, &RawParser, &query)
            .unwrap()
            .is_none());

        search_index.finish_indexing(true);
        let partial = indexed_candidates(&search_index, &store, &index, &RawParser, &query)
            .unwrap()
            .unwrap();
        assert_eq!(partial.view.lines(), &[0, 2, 3]);
        assert_eq!(partial.resume_from, 4);

        // Structured queries always scan
        let query = Query::parse("level:Error");
        assert!(indexed_candidates(&search_index, &store, &index, &RawParser, &query)
            .unwrap()
            .is_none());

        // No hits falls back too
        let query = Query::parse("rror");
        assert!(indexed_candidates(&search_index, &store, &index, &RawParser, &query)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unverified_hits_fall_back_to_scan() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_file, store, index) = fixture("a b\nxa:b\n");
        let search_index = SearchIndex::create(dir.path().join("t.idx.db")).unwrap();
        search_index
            .upsert_batch(&[(0, "a b".to_string()), (1, "xa:b".to_string())])
            .unwrap();
        search_index.finish_indexing(true);

        // The phrase tokenizes to `a b`, which only line 0 holds; line 0 lacks "a:b"
        let query = Query::parse("\"a:b\"");
        assert_eq!(query.as_full_text(), Some("a:b"));
        assert!(indexed_candidates(&search_index, &store, &index, &RawParser, &query)
            .unwrap()
            .is_none());

        let mut scanned = FilteredView::default();
        scanned
            .extend_matching(&store, &index, &RawParser, &query, 0..2)
            .unwrap();
        assert_eq!(scanned.lines(), &[1]);
    }
}
