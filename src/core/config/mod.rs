//! core::config
//!
//! Tool configuration loading.
//!
//! # Overview
//!
//! Two kinds of configuration are in play:
//! - **VCS configuration** (`webrev.remote`, `include.path`, ...) is read
//!   through the revision store and is not handled here.
//! - **Tool configuration** is an optional TOML file with settings that have
//!   no natural home in the VCS config.
//!
//! # Locations
//!
//! Searched in order, first existing file wins:
//! 1. `$SKARA_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/skara/config.toml`
//! 3. `~/.skara/config.toml`
//!
//! A missing file is not an error; defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use skara::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("outgoing jobs: {}", config.outgoing_jobs());
//! ```

pub mod schema;

pub use schema::{OutgoingConfig, ToolConfig, UpdateConfig, DEFAULT_OUTGOING_JOBS};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded tool configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub tool: ToolConfig,
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load from the first existing default location.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// holds invalid values.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let tool: ToolConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tool.validate()?;

        Ok(Self {
            tool,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// Candidate locations, in precedence order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = std::env::var_os("SKARA_CONFIG") {
            paths.push(PathBuf::from(path));
        }
        if let Some(xdg_home) = std::env::var_os("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("skara/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".skara/config.toml"));
        }
        paths
    }

    /// Remote branches examined concurrently by the outgoing search.
    ///
    /// Defaults to [`DEFAULT_OUTGOING_JOBS`].
    pub fn outgoing_jobs(&self) -> usize {
        self.tool
            .outgoing
            .as_ref()
            .and_then(|o| o.jobs)
            .unwrap_or(DEFAULT_OUTGOING_JOBS)
    }

    /// Rebuild command override, if configured.
    pub fn build_command(&self) -> Option<&[String]> {
        self.tool
            .update
            .as_ref()
            .and_then(|u| u.build.as_deref())
    }

    /// Path of the file the configuration came from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
