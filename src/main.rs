//! loglens - print, filter and follow log files from the command line.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use loglens::{EngineConfig, EngineEvent, LogEngine, LogEntry};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for engine internals)
    env_logger::init();

    let matches = Command::new("loglens")
        .version(loglens::VERSION)
        .about("Print, filter and follow log files")
        .long_about(
            "loglens indexes a log file in one pass, detects JSON, timestamped or raw \
             lines, and prints the entries matching a query such as \
             'level:Error OR timeout NOT retry'.",
        )
        .arg(
            Arg::new("file")
                .help("Path to the log file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .value_name("QUERY")
                .help("Only print entries matching the query"),
        )
        .arg(
            Arg::new("follow")
                .short('F')
                .long("follow")
                .action(ArgAction::SetTrue)
                .help("Keep printing lines as they are appended"),
        )
        .arg(
            Arg::new("reverse")
                .short('r')
                .long("reverse")
                .action(ArgAction::SetTrue)
                .help("Print newest entries first"),
        )
        .arg(
            Arg::new("no-index")
                .long("no-index")
                .action(ArgAction::SetTrue)
                .help("Do not build the full-text search index"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Read engine settings from a TOML file (requires the `config` feature)"),
        )
        .get_matches();

    let file_path = PathBuf::from(
        matches
            .get_one::<String>("file")
            .context("file argument is required")?,
    );

    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", file_path.display());
    }

    if !file_path.is_file() {
        anyhow::bail!("Path is not a regular file: {}", file_path.display());
    }

    let mut config = load_config(matches.get_one::<String>("config"))?;
    let follow = matches.get_flag("follow") || config.follow;
    // Following is switched on after the initial listing
    config.follow = false;
    if matches.get_flag("no-index") {
        config.search_index = false;
    }

    let mut engine = LogEngine::new(config);
    engine
        .open(&file_path)
        .await
        .with_context(|| format!("Failed to open {}", file_path.display()))?;
    engine.set_descending(matches.get_flag("reverse"));

    if let Some(filter) = matches.get_one::<String>("filter") {
        engine.set_filter(filter).await?;
    }

    let mut printed = engine.line_count();
    for position in 0..printed {
        print_entry(&engine.entry(position)?);
    }

    if follow {
        follow_updates(&mut engine, &mut printed).await?;
    }

    engine.close().await;
    Ok(())
}

#[cfg(feature = "config")]
fn load_config(path: Option<&String>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(std::path::Path::new(path))?),
        None => Ok(EngineConfig::load_default()?),
    }
}

#[cfg(not(feature = "config"))]
fn load_config(path: Option<&String>) -> Result<EngineConfig> {
    if path.is_some() {
        anyhow::bail!("--config requires loglens to be built with the `config` feature");
    }
    Ok(EngineConfig::default())
}

/// Print entries that arrive until Ctrl-C
async fn follow_updates(engine: &mut LogEngine, printed: &mut u64) -> Result<()> {
    let mut events = engine.subscribe();
    engine.set_follow_enabled(true).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(EngineEvent::Updated) | Err(RecvError::Lagged(_)) => {
                    print_new_entries(engine, printed)?;
                }
                Ok(EngineEvent::IndexingCompleted) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.set_follow_enabled(false).await;
    Ok(())
}

fn print_new_entries(engine: &LogEngine, printed: &mut u64) -> Result<()> {
    let count = engine.line_count();
    // Newest-first output has no "end" to append to, so new entries are printed as they come
    let descending = engine.is_descending();
    for n in *printed..count {
        let position = if descending { count - 1 - n } else { n };
        print_entry(&engine.entry(position)?);
    }
    *printed = count;
    Ok(())
}

fn print_entry(entry: &LogEntry) {
    match (&entry.level, &entry.message) {
        (Some(level), Some(message)) => match entry.timestamp_string() {
            Some(ts) => println!("{} {:<5} {}", ts, level, message),
            None => println!("{:<5} {}", level, message),
        },
        _ => println!("{}", entry.raw_content),
    }
}
