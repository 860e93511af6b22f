//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while setting up workspace watching.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// The workspace root is missing or not a directory.
    #[error("Workspace root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}
