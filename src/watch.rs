use std::path::Path;
use std::sync::mpsc::Sender;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Creates a watcher for the database file that sends `()` on `tx` for every
/// change. The watcher must be kept alive for events to be delivered.
///
/// We watch the parent directory (since SQLite uses temp files like -wal and -shm
/// alongside the main database file), but filter events to only those affecting
/// files whose name starts with the database filename.
pub fn watch_db(db_path: &str, tx: Sender<()>) -> Result<RecommendedWatcher> {
    let db_filename = Path::new(db_path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            // Readers open and close the file constantly; only writes matter.
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            let ours = event.paths.iter().any(|p| {
                p.file_name()
                    .map(|f| f.to_string_lossy().starts_with(&*db_filename))
                    .unwrap_or(false)
            });
            if ours {
                let _ = tx.send(());
            }
        }
    })
    .context("failed to create file watcher")?;

    let path = Path::new(db_path);
    let watch_path = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    watcher
        .watch(watch_path, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", watch_path.display()))?;

    Ok(watcher)
}
