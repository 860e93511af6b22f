//! Typed operations over the `cleartool` command line.

mod client;
mod error;
mod view;

pub use client::*;
pub use error::ClearCaseError;
pub use view::{classify_view_lines, detect_view_type, ViewType};
