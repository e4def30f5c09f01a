//! File watcher that reprocesses notes when they change.
//!
//! Change events come from `notify-debouncer-full` on its own thread and are
//! handed to the async side through a tokio channel. Our own writes produce
//! events too; the reprocess guard drops those during the cooldown.

use std::{
    collections::BTreeSet,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use markdown_serializer_config::Config;
use markdown_serializer_engine::{
    FileProcessingResult, QuerySerializer, ReprocessGuard, Trigger, io, process_file,
};
use notify_debouncer_full::{
    DebounceEventResult, new_debouncer,
    notify::{Event, EventKind, RecursiveMode, Watcher},
};
use relative_path::RelativePathBuf;
use tokio::sync::mpsc::unbounded_channel;

use crate::{process_options, report};

/// Notes created or modified by `events`, relative to `root`, filtered by
/// the config. Paths inside hidden folders are dropped.
fn changed_notes<'a>(
    root: &Path,
    config: &Config,
    events: impl IntoIterator<Item = &'a Event>,
) -> Vec<RelativePathBuf> {
    let mut notes = BTreeSet::new();
    for event in events {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }
        for path in &event.paths {
            let Some(note) = io::relative_to(root, path) else {
                continue;
            };
            let hidden = note.components().any(|c| c.as_str().starts_with('.'));
            if !hidden && config.should_process(&note) {
                notes.insert(note);
            }
        }
    }
    notes.into_iter().collect()
}

async fn process_notes(
    config: &Config,
    serializer: &dyn QuerySerializer,
    guard: &mut ReprocessGuard,
    notes: &[RelativePathBuf],
) -> Vec<FileProcessingResult> {
    let options = process_options(config);
    let now = Instant::now();
    guard.prune(now);

    let mut results = vec![];
    for note in notes {
        if !guard.may_process(note, now) {
            log::debug!("{note}: change caused by our own write, ignoring");
            continue;
        }
        match process_file(&config.notes_path, note, serializer, Trigger::Automatic, &options).await {
            Ok(result) => {
                if result.changed {
                    guard.record_write(note, Instant::now());
                }
                results.push(result);
            }
            Err(err) => log::error!("{note}: {err}"),
        }
    }
    results
}

/// Processes every eligible note once, then each note as it changes, until
/// Ctrl-C.
pub async fn run(config: &Config, serializer: &dyn QuerySerializer, debounce: Duration) -> Result<()> {
    let root = std::fs::canonicalize(&config.notes_path)
        .with_context(|| format!("cannot resolve {}", config.notes_path.display()))?;
    let mut guard = ReprocessGuard::new(config.write_cooldown());

    let (tx, mut rx) = unbounded_channel::<Vec<Event>>();
    let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
        match result {
            Ok(events) => {
                let events: Vec<Event> = events.into_iter().map(|e| e.event).collect();
                if tx.send(events).is_err() {
                    log::debug!("watch loop stopped, dropping file events");
                }
            }
            Err(errors) => {
                for error in errors {
                    log::error!("file watcher error: {error}");
                }
            }
        }
    })
    .context("cannot start file watcher")?;
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("cannot watch {}", root.display()))?;

    log::info!("watching {}", root.display());

    let startup: Vec<_> = io::scan_markdown_files(&root)?
        .into_iter()
        .filter(|note| config.should_process(note))
        .collect();
    let results = process_notes(config, serializer, &mut guard, &startup).await;
    report(&results, config.max_errors_shown);

    loop {
        let events = tokio::select! {
            received = rx.recv() => match received {
                Some(events) => events,
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("stopping watcher");
                return Ok(());
            }
        };

        let notes = changed_notes(&root, config, &events);
        if notes.is_empty() {
            continue;
        }
        let results = process_notes(config, serializer, &mut guard, &notes).await;
        report(&results, config.max_errors_shown);
    }
}
