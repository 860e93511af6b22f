//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scm::ProviderOptions;

fn default_executable() -> String {
    "cleartool".to_string()
}

fn default_true() -> bool {
    true
}

/// Workspace watching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Refresh when files in the workspace change.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Coalesce bursts of file events within this window. Unset means one
    /// refresh per event.
    #[serde(default)]
    pub debounce_ms: Option<u64>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: None,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn debounce(&self) -> Option<Duration> {
        self.debounce_ms.map(Duration::from_millis)
    }
}

/// Configuration for the ClearCase integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScmConfig {
    /// Master switch for the integration.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The `cleartool` executable.
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Workspace root; the current directory when unset.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    /// Collapse repeated paths in the checked-out listing.
    #[serde(default)]
    pub dedupe_checked_outs: bool,
    /// Echo the diagnostic output channel when the command finishes.
    #[serde(default)]
    pub show_output: bool,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for ScmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: default_executable(),
            workspace_root: None,
            dedupe_checked_outs: false,
            show_output: false,
            watch: WatchConfig::default(),
        }
    }
}

impl ScmConfig {
    /// Provider switches derived from this configuration.
    #[must_use]
    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            dedupe_checked_outs: self.dedupe_checked_outs,
        }
    }

    /// Workspace root, falling back to the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn resolve_workspace_root(&self) -> std::io::Result<PathBuf> {
        match &self.workspace_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }
}
