//! Configuration for emberkv
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Destination file for the persisted snapshot
    ///
    /// A leading `~` is expanded against the user's home directory when the
    /// config is constructed.
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Dump to disk after every durable mutation
    ///
    /// When disabled, data only reaches disk on an explicit `commit` (or
    /// `close`). Ephemeral writes skip eager persistence either way.
    pub auto_dump: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./ember.db"),
            auto_dump: true,
        }
    }
}

impl Config {
    /// Create a config with the given destination path and auto-dump flag
    pub fn new(path: impl AsRef<Path>, auto_dump: bool) -> Self {
        Self {
            path: expand_path(path.as_ref()),
            auto_dump,
        }
    }

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the destination file path (expands a leading `~`)
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.path = expand_path(path.as_ref());
        self
    }

    /// Set whether mutations dump to disk eagerly
    pub fn auto_dump(mut self, enabled: bool) -> Self {
        self.config.auto_dump = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Expand a leading `~` against the home directory
///
/// Paths without the shorthand, and systems without a resolvable home
/// directory, pass through unchanged.
fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
