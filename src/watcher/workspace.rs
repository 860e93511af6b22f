//! Recursive watcher over the workspace root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use tokio::sync::mpsc;

use super::error::WatcherError;

/// Kind of file-system change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Changed,
    Created,
    Deleted,
}

impl ChangeKind {
    /// Map a notify event kind; access and unclassified events map to `None`.
    #[must_use]
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Changed),
            EventKind::Remove(_) => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A change somewhere in the workspace tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceChange {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl WorkspaceChange {
    #[must_use]
    pub fn new(kind: ChangeKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }

    /// Convert a notify event, if it is a change, create or delete.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        ChangeKind::from_event_kind(&event.kind).map(|kind| Self::new(kind, event.paths.clone()))
    }
}

enum Backend {
    Immediate(RecommendedWatcher),
    Debounced(Debouncer<RecommendedWatcher, RecommendedCache>),
}

/// Watches the workspace tree and emits one [`WorkspaceChange`] per
/// notification.
///
/// Without a debounce window every event is forwarded as-is; with one,
/// events are coalesced by `notify-debouncer-full` first. Dropping the
/// watcher stops notifications and closes the channel.
pub struct WorkspaceWatcher {
    root: PathBuf,
    backend: Backend,
}

impl std::fmt::Debug for WorkspaceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceWatcher")
            .field("root", &self.root)
            .field("debounced", &self.is_debounced())
            .finish()
    }
}

impl WorkspaceWatcher {
    /// Start watching `root` recursively.
    ///
    /// Returns the watcher and a receiver for change events.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::NotADirectory` if `root` is not a directory,
    /// or a notify error if the watch cannot be installed.
    pub fn new(
        root: impl Into<PathBuf>,
        debounce: Option<Duration>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WorkspaceChange>), WatcherError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory(root));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let backend = match debounce {
            None => {
                let mut watcher =
                    notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                        Ok(event) => forward(&tx, &event),
                        Err(e) => tracing::warn!(error = %e, "File watcher error"),
                    })?;
                watcher.watch(&root, RecursiveMode::Recursive)?;
                Backend::Immediate(watcher)
            }
            Some(timeout) => {
                let mut debouncer =
                    new_debouncer(timeout, None, move |result: DebounceEventResult| match result {
                        Ok(events) => {
                            for event in &events {
                                forward(&tx, &event.event);
                            }
                        }
                        Err(errors) => {
                            for e in errors {
                                tracing::warn!(error = %e, "File watcher error");
                            }
                        }
                    })?;
                debouncer.watch(&root, RecursiveMode::Recursive)?;
                Backend::Debounced(debouncer)
            }
        };

        tracing::debug!(
            root = %root.display(),
            debounce_ms = debounce.map(|d| d.as_millis()),
            "Watching workspace"
        );
        Ok((Self { root, backend }, rx))
    }

    /// Root of the watched tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether events pass through a debounce window.
    #[must_use]
    pub fn is_debounced(&self) -> bool {
        matches!(self.backend, Backend::Debounced(_))
    }
}

fn forward(tx: &mpsc::UnboundedSender<WorkspaceChange>, event: &Event) {
    if let Some(change) = WorkspaceChange::from_event(event) {
        let _ = tx.send(change);
    }
}
