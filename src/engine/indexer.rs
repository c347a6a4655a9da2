//! Background bulk load of the full-text index.

use crate::engine::session::Session;
use crate::engine::EngineEvent;
use crate::error::{LoglensError, Result};
use std::sync::Arc;

/// Load every line present at open into the search index, then flag it ready
///
/// The lines are written in batches on a blocking thread. Each batch is read and written
/// under the session read lock, which keeps it ordered with the tail handler's writes to
/// the same rows. A closed session stops the load between batches.
pub(crate) async fn index_worker(session: Arc<Session>, batch_size: usize) {
    let task_session = Arc::clone(&session);
    let outcome = tokio::task::spawn_blocking(move || bulk_load(&task_session, batch_size)).await;

    let Some(search_index) = session.search_index() else {
        return;
    };

    let complete = match outcome {
        Ok(Ok(true)) => {
            log::info!(
                "Search index ready for {} ({} lines)",
                session.path().display(),
                session.initial_lines()
            );
            true
        }
        Ok(Ok(false)) => {
            log::debug!("Indexing of {} cancelled", session.path().display());
            search_index.finish_indexing(false);
            return;
        }
        Ok(Err(e)) => {
            log::warn!("Search index unavailable, filters will scan: {}", e);
            false
        }
        Err(e) => {
            log::warn!("Indexing task failed: {}", e);
            false
        }
    };

    search_index.finish_indexing(complete);
    let _ = session.events().send(EngineEvent::IndexingCompleted);
}

/// Returns `Ok(false)` when cancelled
fn bulk_load(session: &Session, batch_size: usize) -> Result<bool> {
    let search_index = session
        .search_index()
        .ok_or_else(|| LoglensError::index("No search index for this session"))?;
    let total = session.initial_lines();
    let batch_size = batch_size.max(1) as u64;

    let mut start = 0;
    while start < total {
        if session.is_cancelled() {
            return Ok(false);
        }

        let end = total.min(start + batch_size);
        let state = session.state().read();
        let mut batch = Vec::with_capacity((end - start) as usize);
        for line in start..end {
            batch.push((line, session.read_line(&state.index, line)?));
        }
        search_index.upsert_batch(&batch)?;
        drop(state);

        log::debug!("Indexed lines {}..{} of {}", start, end, total);
        start = end;
    }

    Ok(true)
}
