use crate::source::ChangeEvent;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watch the given files, turning writes to them into change events.
/// Returns the watcher handle (must be kept alive).
///
/// Parent directories are watched rather than the files themselves so that
/// replace-by-rename writes and files that do not exist yet are seen.
pub fn start_watcher(
    files: &[PathBuf],
    tx: mpsc::UnboundedSender<ChangeEvent>,
) -> Result<RecommendedWatcher> {
    let watched: Vec<PathBuf> = files.to_vec();
    let filter = watched.clone();

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        match res {
            Ok(event) => {
                let Some(change) = change_of(&event.kind) else {
                    return;
                };
                if event.paths.iter().any(|path| is_watched(&filter, path)) {
                    debug!("Source file changed ({change:?}): {:?}", event.paths);
                    let _ = tx.send(change);
                }
            }
            Err(e) => {
                error!("Watcher error: {}", e);
            }
        }
    })
    .context("Failed to create file watcher")?;

    let dirs: BTreeSet<&Path> = watched.iter().filter_map(|file| file.parent()).collect();
    for dir in dirs {
        info!("Watching directory: {}", dir.display());
        if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            warn!("Failed to watch {}: {}", dir.display(), e);
        }
    }

    Ok(watcher)
}

fn change_of(kind: &EventKind) -> Option<ChangeEvent> {
    match kind {
        EventKind::Create(_) => Some(ChangeEvent::Created),
        EventKind::Modify(_) => Some(ChangeEvent::Updated),
        EventKind::Remove(_) => Some(ChangeEvent::Removed),
        _ => None,
    }
}

/// Matches on file name within the same directory, so temp files written
/// next to a watched file are ignored.
fn is_watched(files: &[PathBuf], path: &Path) -> bool {
    files.iter().any(|file| {
        file.file_name() == path.file_name()
            && match (file.parent(), path.parent()) {
                (Some(a), Some(b)) => a == b || same_dir(a, b),
                _ => false,
            }
    })
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
