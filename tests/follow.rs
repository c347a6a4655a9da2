use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use loglens::{EngineConfig, EngineEvent, LogEngine};
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Duration};

const TIMEOUT_MS: u64 = 5000;

fn follow_config() -> EngineConfig {
    EngineConfig {
        search_index: false,
        settle_delay: Duration::from_millis(5),
        poll_interval: Duration::from_millis(50),
        ..EngineConfig::default()
    }
}

fn write_log(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("live.log");
    std::fs::write(&path, contents).expect("write log");
    path
}

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open for append");
    file.write_all(text.as_bytes()).expect("append");
    file.flush().expect("flush");
}

async fn next_update(events: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        let event = timeout(Duration::from_millis(TIMEOUT_MS), events.recv())
            .await
            .expect("update timed out")
            .expect("event channel closed unexpectedly");
        if event == EngineEvent::Updated {
            return;
        }
    }
}

async fn wait_for_count(engine: &LogEngine, expected: u64) {
    timeout(Duration::from_millis(TIMEOUT_MS), async {
        while engine.line_count() != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("line count never reached");
}

async fn following(path: &Path, config: EngineConfig) -> LogEngine {
    let mut engine = LogEngine::new(config);
    engine.open(path).await.expect("open log");
    engine.set_follow_enabled(true).await;
    assert!(engine.is_following());
    engine
}

#[tokio::test]
async fn appended_line_raises_one_update() {
    let dir = TempDir::new().unwrap();
    let path = write_log(&dir, "Line 1\nLine 2\n");
    let mut engine = following(&path, follow_config()).await;
    let mut events = engine.subscribe();

    append(&path, "Line 3\n");
    next_update(&mut events).await;

    assert_eq!(engine.line_count(), 3);
    assert_eq!(engine.entry(2).unwrap().raw_content, "Line 3");

    // Later signals find nothing new and stay quiet
    sleep(Duration::from_millis(300)).await;
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));

    engine.close().await;
}

#[tokio::test]
async fn appended_lines_extend_active_filter() {
    let dir = TempDir::new().unwrap();
    let path = write_log(&dir, "Error: a\nInfo: b\n");
    let mut engine = following(&path, follow_config()).await;
    engine.set_filter("error").await.unwrap();
    assert_eq!(engine.line_count(), 1);

    append(&path, "Info: c\nError: d\nWarning: e\n");
    wait_for_count(&engine, 2).await;

    assert_eq!(engine.total_lines(), 5);
    assert_eq!(engine.entry(1).unwrap().raw_content, "Error: d");
    assert_eq!(engine.entry(1).unwrap().index, 3);

    engine.close().await;
}

#[tokio::test]
async fn partial_line_is_completed_by_later_write() {
    let dir = TempDir::new().unwrap();
    let path = write_log(&dir, "first\n");
    let mut engine = following(&path, follow_config()).await;
    let mut events = engine.subscribe();

    append(&path, "second half");
    next_update(&mut events).await;
    assert_eq!(engine.line_count(), 2);
    assert_eq!(engine.raw_line(1).unwrap(), "second half");

    append(&path, "-written\nthird\n");
    wait_for_count(&engine, 3).await;
    assert_eq!(engine.raw_line(1).unwrap(), "second half-written");
    assert_eq!(engine.raw_line(2).unwrap(), "third");

    engine.close().await;
}

#[tokio::test]
async fn disabled_follow_ignores_growth_until_enabled() {
    let dir = TempDir::new().unwrap();
    let path = write_log(&dir, "one\n");
    let mut engine = LogEngine::new(follow_config());
    engine.open(&path).await.unwrap();
    assert!(!engine.is_following());

    append(&path, "two\n");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.line_count(), 1);

    engine.set_follow_enabled(true).await;
    wait_for_count(&engine, 2).await;

    engine.set_follow_enabled(false).await;
    append(&path, "three\n");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.line_count(), 2);

    engine.close().await;
}

#[tokio::test]
async fn follow_setting_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = write_log(&dir, "a\n");
    let mut engine = following(&path, follow_config()).await;

    engine.open(&path).await.unwrap();
    assert!(engine.is_following());

    append(&path, "b\n");
    wait_for_count(&engine, 2).await;

    engine.close().await;
}

#[tokio::test]
async fn descending_view_shows_newest_first_while_following() {
    let dir = TempDir::new().unwrap();
    let path = write_log(&dir, "old\n");
    let mut engine = following(&path, follow_config()).await;
    engine.set_descending(true);

    append(&path, "new\n");
    wait_for_count(&engine, 2).await;
    assert_eq!(engine.entry(0).unwrap().raw_content, "new");
    assert_eq!(engine.entry(1).unwrap().raw_content, "old");

    engine.close().await;
}

#[tokio::test]
async fn tailed_lines_reach_search_index() {
    let dir = TempDir::new().unwrap();
    let path = write_log(&dir, "Info: boot\n");
    let config = EngineConfig {
        search_index: true,
        ..follow_config()
    };
    let mut engine = following(&path, config).await;

    timeout(Duration::from_millis(TIMEOUT_MS), async {
        while engine.is_indexing() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("indexing timed out");

    append(&path, "Error: disk full\n");
    wait_for_count(&engine, 2).await;

    engine.set_filter("disk full").await.unwrap();
    assert_eq!(engine.line_count(), 1);
    assert_eq!(engine.entry(0).unwrap().index, 1);

    engine.close().await;
}
