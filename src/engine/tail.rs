//! Follow mode: turn growth signals into calls to the session's growth handler.
//!
//! Two sources signal growth: an OS file watcher (when the platform provides one) and a
//! poll interval, so following keeps working on file systems that do not report changes.
//! Signals are coalesced; each handler run ingests everything appended so far.

use crate::engine::session::Session;
use crate::error::Result;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const SIGNAL_CAPACITY: usize = 16;

/// Commands understood by the tail loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TailSignal {
    /// The file may have grown
    Changed,
    Shutdown,
}

/// A running tail loop and the watcher feeding it
pub(crate) struct TailHandle {
    tx: Sender<TailSignal>,
    task: JoinHandle<()>,
    _watcher: Option<RecommendedWatcher>,
}

impl TailHandle {
    /// Start following the session's file
    pub fn spawn(session: Arc<Session>, settle_delay: Duration, poll_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(SIGNAL_CAPACITY);

        let watcher = match watch_file(&session, tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                log::warn!(
                    "Cannot watch {}, polling every {:?}: {}",
                    session.path().display(),
                    poll_interval,
                    e
                );
                None
            }
        };

        let task = tokio::spawn(tail_worker_loop(rx, session, settle_delay, poll_interval));

        Self {
            tx,
            task,
            _watcher: watcher,
        }
    }

    /// Stop following; a growth handler already running is allowed to finish
    pub async fn shutdown(self) {
        let Self {
            tx,
            task,
            _watcher: watcher,
        } = self;
        drop(watcher);

        // The loop may already have exited on its own
        let _ = tx.send(TailSignal::Shutdown).await;
        if let Err(e) = task.await {
            log::warn!("Tail task failed: {}", e);
        }
    }
}

fn watch_file(session: &Session, tx: Sender<TailSignal>) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |event: notify::Result<Event>| match event {
            Ok(event) if is_growth(&event.kind) => {
                // A full channel already holds a pending signal
                let _ = tx.try_send(TailSignal::Changed);
            }
            Ok(_) => {}
            Err(e) => log::debug!("File watcher error: {}", e),
        },
        NotifyConfig::default(),
    )?;
    watcher.watch(session.path(), RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn is_growth(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
    )
}

/// Process growth signals until shutdown or until the session is closed
pub(crate) async fn tail_worker_loop(
    mut rx: Receiver<TailSignal>,
    session: Arc<Session>,
    settle_delay: Duration,
    poll_interval: Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let signal = tokio::select! {
            signal = rx.recv() => signal.unwrap_or(TailSignal::Shutdown),
            _ = ticker.tick() => TailSignal::Changed,
        };

        let outcome = handle_signal(&mut rx, &session, signal, settle_delay).await;
        if outcome.done {
            break;
        }
    }

    log::debug!("Stopped following {}", session.path().display());
}

async fn handle_signal(
    rx: &mut Receiver<TailSignal>,
    session: &Arc<Session>,
    signal: TailSignal,
    settle_delay: Duration,
) -> HandlerOutcome {
    if signal == TailSignal::Shutdown || session.is_cancelled() {
        return HandlerOutcome::exit();
    }

    if !settle_delay.is_zero() {
        tokio::time::sleep(settle_delay).await;
    }

    // Fold signals that piled up while settling into this run
    let mut shutdown_requested = false;
    while let Ok(pending) = rx.try_recv() {
        if pending == TailSignal::Shutdown {
            shutdown_requested = true;
            break;
        }
    }

    let task_session = Arc::clone(session);
    match tokio::task::spawn_blocking(move || task_session.apply_growth()).await {
        Ok(Ok(0)) => {}
        Ok(Ok(added)) => log::debug!("Tail picked up {} lines", added),
        Ok(Err(e)) if e.is_transient() => {
            log::debug!("Growth check deferred: {}", e);
        }
        Ok(Err(e)) => log::warn!("Growth check failed, retrying on next signal: {}", e),
        Err(e) => log::warn!("Growth handler panicked: {}", e),
    }

    if shutdown_requested {
        HandlerOutcome::exit()
    } else {
        HandlerOutcome::continue_watching()
    }
}

struct HandlerOutcome {
    done: bool,
}

impl HandlerOutcome {
    fn continue_watching() -> Self {
        Self { done: false }
    }

    fn exit() -> Self {
        Self { done: true }
    }
}
