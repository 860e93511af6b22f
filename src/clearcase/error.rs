//! ClearCase client error types.

use crate::process::ProcessError;

/// Errors returned by [`super::ClearCaseClient`] operations.
#[derive(thiserror::Error, Debug)]
pub enum ClearCaseError {
    /// The external tool could not be run or exited unsuccessfully.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The view storage descriptor matched neither dynamic nor snapshot.
    #[error("Unknown view type!")]
    UnknownViewType,

    /// The operation is recognised but intentionally disabled.
    #[error("Not (yet) supported command: {0}")]
    Unsupported(&'static str),

    /// A path-taking operation was called with no paths.
    #[error("No paths given for {0}")]
    NoPaths(&'static str),
}

impl ClearCaseError {
    /// Exit code of the underlying tool failure, if any.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Process(err) => err.exit_code(),
            _ => None,
        }
    }
}
