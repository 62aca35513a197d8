//! Directory-event intake.
//!
//! Turns watcher events on the staging directory into album-processing
//! requests. A fixed settle delay runs before a new directory is treated
//! as fully copied, and a per-run set of already-processed paths prevents
//! handling the same directory twice within one monitoring session.

pub mod watcher;

pub use watcher::{DirWatcher, WatchError, WatchEvent};

use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::organizer;

/// Monitor behavior knobs.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Wait after a directory appears before treating it as complete
    pub settle_delay: Duration,
    /// Resolve and log placements without moving anything
    pub dry_run: bool,
}

/// Decide whether an event path is a candidate album directory: it must
/// still be a directory, sitting directly under the watched root. Events
/// for plain files and for paths moved somewhere else are ignored.
fn is_candidate_dir(path: &Path, root: &Path) -> bool {
    path.is_dir() && path.parent() == Some(root)
}

/// Watch the staging directory and process each new album directory as it
/// appears, until `shutdown` is set.
///
/// `processed` seeds duplicate suppression with the paths the batch pass
/// already handled; the updated set is returned on shutdown. Watcher setup
/// failures propagate to the caller - everything after that is scoped to
/// single albums.
pub async fn monitor(
    pool: &SqlitePool,
    unsorted_dir: &Path,
    music_dir: &Path,
    mut processed: HashSet<PathBuf>,
    opts: MonitorOptions,
    shutdown: Arc<AtomicBool>,
) -> Result<HashSet<PathBuf>> {
    let (watcher, rx) = DirWatcher::new(unsorted_dir)?;

    info!(
        "Monitoring {} for new albums (Ctrl+C to stop)",
        unsorted_dir.display()
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Monitoring stopped");
            break;
        }

        // Poll with a timeout so the shutdown flag is observed between events
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(WatchEvent::DirCreated(path) | WatchEvent::DirMovedIn(path)) => {
                if !is_candidate_dir(&path, unsorted_dir) {
                    debug!(path = %path.display(), "Ignoring event outside watched root");
                    continue;
                }

                // Settle delay: give a partially-copied album time to finish
                tokio::time::sleep(opts.settle_delay).await;
                if !path.is_dir() {
                    debug!(path = %path.display(), "Directory vanished before settling");
                    continue;
                }

                if !processed.insert(path.clone()) {
                    debug!(path = %path.display(), "Already processed, skipping");
                    continue;
                }

                organizer::process_album(pool, &path, music_dir, opts.dry_run).await;
            }
            Ok(WatchEvent::Error(e)) => {
                warn!(error = %e, "Watcher reported an error");
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                warn!("Watcher channel disconnected");
                break;
            }
        }
    }

    drop(watcher);
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_candidate_requires_directory() {
        let root = tempdir().unwrap();
        let file = root.path().join("loose-file.mp3");
        std::fs::write(&file, b"x").unwrap();

        assert!(!is_candidate_dir(&file, root.path()));
    }

    #[test]
    fn test_candidate_requires_parent_to_be_root() {
        let root = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();

        let inside = root.path().join("Album");
        std::fs::create_dir(&inside).unwrap();
        assert!(is_candidate_dir(&inside, root.path()));

        // A directory moved somewhere other than the watched root
        let outside = elsewhere.path().join("Album");
        std::fs::create_dir(&outside).unwrap();
        assert!(!is_candidate_dir(&outside, root.path()));

        // Nested directories are not album candidates either
        let nested = inside.join("cd2");
        std::fs::create_dir(&nested).unwrap();
        assert!(!is_candidate_dir(&nested, root.path()));
    }

    #[test]
    fn test_candidate_requires_existing_path() {
        let root = tempdir().unwrap();
        let gone = root.path().join("never-created");
        assert!(!is_candidate_dir(&gone, root.path()));
    }
}
