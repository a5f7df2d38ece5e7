//! Re-running a command when its file changes

use std::{
    path::{Path, PathBuf},
    sync::mpsc,
};

use notify::{Event, RecursiveMode, Watcher};

/// Calls `run` once, then again every time the file at `path` is written.
///
/// The parent directory is watched rather than the file itself so that
/// editors that save by replacing the file are noticed too. Returns the
/// result of the last run once the watcher stops.
pub fn watch(path: &Path, mut run: impl FnMut() -> bool) -> notify::Result<bool> {
    let directory = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;

    watcher.watch(&directory, RecursiveMode::NonRecursive)?;

    tracing::debug!(path = %path.display(), "watching file");

    let mut success = run();

    for event in rx {
        match event {
            Ok(event) if is_change_of(&event, path) => {
                tracing::debug!(path = %path.display(), "file changed");

                success = run();
            }
            Ok(_) => {}
            Err(error) => tracing::warn!(%error, "file watcher error"),
        }
    }

    Ok(success)
}

fn is_change_of(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create()) && event.paths.iter().any(|changed| changed == path)
}
