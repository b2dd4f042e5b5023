use anyhow::Result;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tracing::warn;

/// Watch `dir` recursively; `on_change` fires on any event beneath it.
///
/// The subscription lives as long as the returned watcher — drop it to
/// cancel.
pub fn watch_directory<F>(dir: &Path, on_change: F) -> Result<RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    watch_path(dir, RecursiveMode::Recursive, on_change)
}

/// Watch a single file (e.g. an ignore file at the working-tree root).
pub fn watch_file<F>(file: &Path, on_change: F) -> Result<RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    watch_path(file, RecursiveMode::NonRecursive, on_change)
}

fn watch_path<F>(path: &Path, mode: RecursiveMode, on_change: F) -> Result<RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(_event) => on_change(),
            Err(e) => warn!(err = %e, "file watcher error"),
        })?;

    watcher.watch(path, mode)?;
    Ok(watcher)
}
