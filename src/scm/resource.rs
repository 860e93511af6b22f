//! Resources shown in the source-control groups.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::clearcase::unquote;

/// Separator between an element path and its version in extended names.
pub const EXTENDED_NAME_SEPARATOR: &str = "@@";

/// A file tracked by one of the resource groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrackedResource {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl TrackedResource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: Some(version.into()),
        }
    }

    /// Resource for a plain path line, resolved against `root`.
    #[must_use]
    pub fn from_path_line(root: &Path, line: &str) -> Self {
        Self::new(resolve_path(root, line))
    }

    /// Resource for a `path@@version` line, resolved against `root`.
    ///
    /// Lines without the separator yield a resource with no version.
    #[must_use]
    pub fn from_element_line(root: &Path, line: &str) -> Self {
        let (path, version) = split_extended_name(line);
        Self {
            path: resolve_path(root, path),
            version: version.map(str::to_string),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version tag from the extended name, if known.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `path@@version`, or just the path when there is no version.
    #[must_use]
    pub fn extended_name(&self) -> String {
        match &self.version {
            Some(version) => format!(
                "{}{EXTENDED_NAME_SEPARATOR}{version}",
                self.path.display()
            ),
            None => self.path.display().to_string(),
        }
    }
}

/// Split an extended name at the first `@@`.
#[must_use]
pub fn split_extended_name(line: &str) -> (&str, Option<&str>) {
    match line.split_once(EXTENDED_NAME_SEPARATOR) {
        Some((path, version)) => (path, Some(version)),
        None => (line, None),
    }
}

/// Resolve a path printed by the tool against the workspace root.
///
/// Absolute paths are kept as printed.
#[must_use]
pub fn resolve_path(root: &Path, raw: &str) -> PathBuf {
    root.join(unquote(raw.trim()))
}
