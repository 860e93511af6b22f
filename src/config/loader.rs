//! Locating and reading the configuration file.

use std::path::{Path, PathBuf};

use super::ScmConfig;

/// Project-local configuration file name.
pub const LOCAL_CONFIG_FILE: &str = ".clearcase-scm.toml";

/// Where a configuration may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file named on the command line; it must exist.
    Explicit(PathBuf),
    /// Well-known locations, first existing one wins; none means defaults.
    Discovered(Vec<PathBuf>),
}

/// Resolves a [`ConfigSource`] into an [`ScmConfig`].
#[derive(Debug)]
pub struct ConfigLoader {
    source: ConfigSource,
}

impl ConfigLoader {
    /// Look in the workspace first, then the user config directory.
    #[must_use]
    pub fn discover() -> Self {
        let candidates = std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE))
            .chain(dirs::config_dir().map(|dir| dir.join("clearcase-scm").join("config.toml")))
            .collect();
        Self {
            source: ConfigSource::Discovered(candidates),
        }
    }

    /// Read exactly `path`.
    #[must_use]
    pub fn from_file(path: PathBuf) -> Self {
        Self {
            source: ConfigSource::Explicit(path),
        }
    }

    #[must_use]
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// The file [`Self::load`] would read, if any.
    #[must_use]
    pub fn locate(&self) -> Option<&Path> {
        match &self.source {
            ConfigSource::Explicit(path) => Some(path),
            ConfigSource::Discovered(candidates) => candidates
                .iter()
                .map(PathBuf::as_path)
                .find(|path| path.is_file()),
        }
    }

    /// Load the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the chosen file cannot be read (an
    /// explicit file that does not exist included), or `ConfigError::Parse`
    /// if it is not valid configuration TOML.
    pub fn load(&self) -> Result<ScmConfig, ConfigError> {
        let Some(path) = self.locate() else {
            tracing::debug!("No config file found, using defaults");
            return Ok(ScmConfig::default());
        };
        tracing::debug!(path = %path.display(), "Loading config file");

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::discover()
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
