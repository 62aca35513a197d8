//! File system watcher for the staging directory.
//!
//! Uses the `notify` crate to watch the unsorted directory (non-recursive)
//! and emit events when new album directories appear, either created in
//! place or moved in from elsewhere.
//!
//! # Design
//!
//! - **Debounced events**: Multiple rapid changes coalesce into single events
//! - **Directories only matter**: files and partial rename halves are
//!   filtered downstream, where the path can be re-checked
//! - **Non-blocking**: the notify callback thread only forwards events via
//!   a channel
//! - **Graceful shutdown**: drop the handle to stop watching

use crossbeam_channel::{Receiver, Sender, bounded};
use notify::{
    RecommendedWatcher, RecursiveMode,
    event::{CreateKind, ModifyKind, RenameMode},
};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Events emitted by the directory watcher.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A directory was created under the watched root
    DirCreated(PathBuf),
    /// A directory was renamed/moved into the watched root
    DirMovedIn(PathBuf),
    /// An error occurred while watching
    Error(String),
}

/// Handle to a running directory watcher.
///
/// Dropping this handle will stop the watcher.
pub struct DirWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    running: Arc<AtomicBool>,
}

impl DirWatcher {
    /// Create a watcher for the given staging directory.
    ///
    /// The watch is non-recursive: only entries directly under the root
    /// are album candidates. Returns the watcher handle and a receiver
    /// for watch events.
    pub fn new(root: &Path) -> Result<(Self, Receiver<WatchEvent>), WatchError> {
        let (tx, rx) = bounded(256);
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        // Create debouncer with 500ms timeout
        let mut debouncer = new_debouncer(
            Duration::from_millis(500),
            None, // No tick rate limit
            move |result: DebounceEventResult| {
                if !running_clone.load(Ordering::Relaxed) {
                    return;
                }
                Self::handle_debounced_events(result, &tx);
            },
        )
        .map_err(|e| WatchError::Init(e.to_string()))?;

        tracing::info!(target: "scanner::watcher", path = %root.display(), "Watching directory");
        debouncer
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Watch(e.to_string()))?;

        Ok((
            Self {
                _debouncer: debouncer,
                running,
            },
            rx,
        ))
    }

    /// Handle debounced events from notify.
    ///
    /// Only create and rename-to events are forwarded; whether the path is
    /// actually a directory under the root is re-checked by the receiver,
    /// after the settle delay.
    fn handle_debounced_events(result: DebounceEventResult, tx: &Sender<WatchEvent>) {
        match result {
            Ok(events) => {
                for event in events {
                    match event.kind {
                        notify::EventKind::Create(CreateKind::Folder | CreateKind::Any) => {
                            for path in &event.paths {
                                tracing::debug!(target: "scanner::watcher", path = %path.display(), "Create event");
                                let _ = tx.try_send(WatchEvent::DirCreated(path.clone()));
                            }
                        }
                        notify::EventKind::Modify(ModifyKind::Name(
                            RenameMode::To | RenameMode::Both | RenameMode::Any,
                        )) => {
                            // For a complete rename pair the destination is
                            // the last reported path
                            if let Some(path) = event.paths.last() {
                                tracing::debug!(target: "scanner::watcher", path = %path.display(), "Moved-in event");
                                let _ = tx.try_send(WatchEvent::DirMovedIn(path.clone()));
                            }
                        }
                        _ => {}
                    }
                }
            }
            Err(errors) => {
                for error in errors {
                    tracing::warn!(target: "scanner::watcher", error = %error, "Watch error");
                    let _ = tx.try_send(WatchEvent::Error(error.to_string()));
                }
            }
        }
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        tracing::debug!(target: "scanner::watcher", "Directory watcher stopped");
    }
}

/// Errors that can occur during file watching.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {0}")]
    Init(String),
    #[error("Failed to watch path: {0}")]
    Watch(String),
}
