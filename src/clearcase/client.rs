//! ClearCase client: one method per `cleartool` operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::process::{LineBatches, LogSink, ToolRunner};

use super::error::ClearCaseError;
use super::view::{detect_view_type, ViewType};

const LS_CHECKED_OUT: &[&str] = &["lsco", "-s", "-r"];
const LS_ELEMENTS: &[&str] = &["ls", "-vob", "-r", "-s"];
const LS_PRIVATE_DYNAMIC: &[&str] = &["lspriv"];
const LS_PRIVATE_SNAPSHOT: &[&str] = &["ls", "-r", "-view_only"];
const LS_VERSION_TREE: &[&str] = &["lsvtree", "-g"];
const CHECK_IN: &[&str] = &["ci"];
const CHECK_OUT: &[&str] = &["co", "-nc"];
const UNDO_CHECK_OUT: &[&str] = &["unco", "-keep"];
const DESCRIBE_SHORT: &[&str] = &["describe", "-short"];
const VERSION_INFO: &[&str] = &["-verAll"];

/// Suffix `describe -short` prints for a checked-out version.
pub const CHECKED_OUT_MARKER: &str = "CHECKEDOUT";

/// Tag view-private listings append to checked-out files.
pub const CHECKED_OUT_PRIVATE_TAG: &str = "[checkedout]";

/// Whether a view-private listing line denotes a checked-out element.
#[must_use]
pub fn is_checked_out_private(line: &str) -> bool {
    line.trim_end().ends_with(CHECKED_OUT_PRIVATE_TAG)
}

/// Strip one pair of surrounding double quotes.
///
/// Paths reach the client from hosts that pre-quote them for a shell; the
/// argument vector must carry the bare path.
#[must_use]
pub fn unquote(path: &str) -> &str {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
}

fn path_operand(path: &Path) -> String {
    unquote(&path.to_string_lossy()).to_string()
}

fn build_args<I>(template: &[&str], operands: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    template
        .iter()
        .map(|s| (*s).to_string())
        .chain(operands)
        .collect()
}

/// Typed front end to `cleartool`.
#[derive(Clone)]
pub struct ClearCaseClient {
    runner: Arc<dyn ToolRunner>,
    log: Arc<dyn LogSink>,
}

impl std::fmt::Debug for ClearCaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClearCaseClient")
            .field("workspace_root", &self.runner.workspace_root())
            .finish_non_exhaustive()
    }
}

impl ClearCaseClient {
    #[must_use]
    pub fn new(runner: Arc<dyn ToolRunner>, log: Arc<dyn LogSink>) -> Self {
        Self { runner, log }
    }

    /// Root of the workspace all listings are scoped to.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        self.runner.workspace_root()
    }

    /// The diagnostic sink shared with the runner.
    #[must_use]
    pub fn log(&self) -> &Arc<dyn LogSink> {
        &self.log
    }

    fn root_operand(&self) -> String {
        path_operand(self.workspace_root())
    }

    fn path_args(
        template: &[&str],
        paths: &[PathBuf],
        operation: &'static str,
    ) -> Result<Vec<String>, ClearCaseError> {
        if paths.is_empty() {
            return Err(ClearCaseError::NoPaths(operation));
        }
        Ok(build_args(template, paths.iter().map(PathBuf::as_path).map(path_operand)))
    }

    async fn execute(&self, args: &[String]) -> Result<(), ClearCaseError> {
        self.runner.start(args)?.finish().await?;
        Ok(())
    }

    /// Version banner of the installed tool (`cleartool -verAll`).
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::ToolNotFound` when `cleartool` is not installed.
    pub async fn tool_info(&self) -> Result<String, ClearCaseError> {
        let lines = self
            .runner
            .start(&build_args(VERSION_INFO, []))?
            .collect_lines()
            .await?;
        Ok(lines.join("\n"))
    }

    /// Paths checked out anywhere below the workspace root.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be started.
    pub fn list_checked_outs(&self) -> Result<LineBatches, ClearCaseError> {
        let args = build_args(LS_CHECKED_OUT, [self.root_operand()]);
        Ok(self.runner.start(&args)?)
    }

    /// All versioned elements below the workspace root, as
    /// `path@@version` lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be started.
    pub fn list_elements(&self) -> Result<LineBatches, ClearCaseError> {
        let args = build_args(LS_ELEMENTS, [self.root_operand()]);
        Ok(self.runner.start(&args)?)
    }

    /// View-private files below the workspace root.
    ///
    /// The listing command depends on the view type. Entries tagged
    /// `[checkedout]` are dropped; [`Self::list_checked_outs`] reports them.
    ///
    /// # Errors
    ///
    /// Returns `ClearCaseError::UnknownViewType` if the view cannot be
    /// classified, or a process error from either command.
    pub async fn list_view_privates(&self) -> Result<LineBatches, ClearCaseError> {
        let template = match self.detect_view_type().await? {
            ViewType::Dynamic => LS_PRIVATE_DYNAMIC,
            ViewType::Snapshot => LS_PRIVATE_SNAPSHOT,
            ViewType::Unknown => return Err(ClearCaseError::UnknownViewType),
        };
        let args = build_args(template, [self.root_operand()]);
        Ok(self
            .runner
            .start(&args)?
            .filter_lines(|line| !is_checked_out_private(line)))
    }

    /// Classify the view the workspace lives in.
    ///
    /// # Errors
    ///
    /// Returns a process error if `lsview` fails.
    pub async fn detect_view_type(&self) -> Result<ViewType, ClearCaseError> {
        Ok(detect_view_type(self.runner.as_ref()).await?)
    }

    /// Open the graphical version tree for `paths`.
    ///
    /// Returns once the viewer is launched; its exit is only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if `paths` is empty or the viewer cannot be started.
    pub fn show_version_tree(&self, paths: &[PathBuf]) -> Result<(), ClearCaseError> {
        let args = Self::path_args(LS_VERSION_TREE, paths, "lsvtree")?;
        let viewer = self.runner.start(&args)?;
        let log = Arc::clone(&self.log);
        tokio::spawn(async move {
            if let Err(e) = viewer.finish().await {
                tracing::warn!(error = %e, "Version tree viewer failed");
                log.append_line(&e.to_string());
            }
        });
        Ok(())
    }

    /// Check in `paths`, with `comment` when it is non-empty and `-nc`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if `paths` is empty or `cleartool ci` fails.
    pub async fn check_in(&self, paths: &[PathBuf], comment: &str) -> Result<(), ClearCaseError> {
        let mut template = CHECK_IN.to_vec();
        if comment.is_empty() {
            template.push("-nc");
        } else {
            template.extend(["-c", comment]);
        }
        let args = Self::path_args(&template, paths, "ci")?;
        self.execute(&args).await
    }

    /// Check out `paths` without a comment.
    ///
    /// # Errors
    ///
    /// Returns an error if `paths` is empty or `cleartool co` fails.
    pub async fn check_out(&self, paths: &[PathBuf]) -> Result<(), ClearCaseError> {
        let args = Self::path_args(CHECK_OUT, paths, "co")?;
        self.execute(&args).await
    }

    /// Undo the checkout of `paths`, keeping the working copy contents.
    ///
    /// # Errors
    ///
    /// Returns an error if `paths` is empty or `cleartool unco` fails.
    pub async fn undo_check_out(&self, paths: &[PathBuf]) -> Result<(), ClearCaseError> {
        let args = Self::path_args(UNDO_CHECK_OUT, paths, "unco")?;
        self.execute(&args).await
    }

    /// Whether `path` is checked out in this view.
    ///
    /// # Errors
    ///
    /// Returns a process error if `describe` fails.
    pub async fn is_checked_out(&self, path: &Path) -> Result<bool, ClearCaseError> {
        let args = build_args(DESCRIBE_SHORT, [path_operand(path)]);
        let lines = self.runner.start(&args)?.collect_lines().await?;
        Ok(lines
            .first()
            .is_some_and(|line| line.trim_end().ends_with(CHECKED_OUT_MARKER)))
    }

    /// Make new elements. Disabled: logs a warning and does nothing.
    ///
    /// # Errors
    ///
    /// Always returns `ClearCaseError::Unsupported`.
    pub async fn mkelem(&self, paths: &[PathBuf]) -> Result<(), ClearCaseError> {
        tracing::warn!(paths = paths.len(), "mkelem is not supported");
        let err = ClearCaseError::Unsupported("mkelem");
        self.log.append_line(&err.to_string());
        Err(err)
    }
}
