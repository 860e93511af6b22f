//! View type detection from `lsview -long` output.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::process::{ProcessError, ToolRunner};

/// Arguments describing the current view.
pub(crate) const LS_VIEW: &[&str] = &["lsview", "-cview", "-long"];

static STORAGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(vws|stg)$").expect("valid view storage pattern"));

/// Kind of ClearCase view backing the workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    Unknown,
    /// Content served on demand by the MVFS daemon.
    Dynamic,
    /// Content materialised in the local file system.
    Snapshot,
}

/// Classify a view from descriptor lines.
///
/// The first line whose trailing segment ends in a view storage suffix
/// decides: `.vws` is a dynamic view, `.stg` a snapshot view. No match is
/// `Unknown`.
#[must_use]
pub fn classify_view_lines<S: AsRef<str>>(lines: &[S]) -> ViewType {
    lines
        .iter()
        .find_map(|line| STORAGE_SUFFIX.captures(line.as_ref().trim_end()))
        .map_or(ViewType::Unknown, |caps| {
            if caps[1].eq_ignore_ascii_case("vws") {
                ViewType::Dynamic
            } else {
                ViewType::Snapshot
            }
        })
}

/// Describe the current view through `runner` and classify it.
///
/// # Errors
///
/// Returns `ProcessError` if `lsview` cannot be run or fails.
pub async fn detect_view_type(runner: &dyn ToolRunner) -> Result<ViewType, ProcessError> {
    let args: Vec<String> = LS_VIEW.iter().map(|s| (*s).to_string()).collect();
    let lines = runner.start(&args)?.collect_lines().await?;
    let view_type = classify_view_lines(&lines);
    tracing::debug!(?view_type, lines = lines.len(), "Detected view type");
    Ok(view_type)
}
