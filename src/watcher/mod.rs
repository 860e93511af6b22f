//! Workspace file-system watching.
//!
//! Merges change, create and delete notifications for the workspace tree
//! into a single stream of [`WorkspaceChange`] events.

mod error;
mod workspace;

pub use error::WatcherError;
pub use workspace::{ChangeKind, WorkspaceChange, WorkspaceWatcher};
