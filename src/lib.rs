//! ClearCase SCM - source-control integration over `cleartool`.
//!
//! Lists checked-out, versioned and view-private files, dispatches
//! checkout/checkin/undo-checkout/version-tree actions, and keeps the
//! resulting resource groups in sync with workspace file changes.

pub mod clearcase;
pub mod config;
pub mod display;
pub mod process;
pub mod scm;
pub mod watcher;
