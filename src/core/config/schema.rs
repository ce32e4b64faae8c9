//! core::config::schema
//!
//! Tool configuration schema.
//!
//! ```toml
//! [outgoing]
//! jobs = 4
//!
//! [update]
//! build = ["cargo", "build", "--release"]
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default number of remote branches examined concurrently.
pub const DEFAULT_OUTGOING_JOBS: usize = 4;

/// Top-level tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Outgoing-change search settings
    pub outgoing: Option<OutgoingConfig>,

    /// Self-update settings
    pub update: Option<UpdateConfig>,
}

impl ToolConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(outgoing) = &self.outgoing {
            if outgoing.jobs == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "outgoing.jobs must be at least 1".into(),
                ));
            }
        }

        if let Some(update) = &self.update {
            if let Some(build) = &update.build {
                if build.first().map_or(true, |program| program.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue(
                        "update.build must name a program".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// `[outgoing]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutgoingConfig {
    /// Remote branches fetched and compared concurrently
    pub jobs: Option<usize>,
}

/// `[update]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateConfig {
    /// Rebuild command run in the installation root (program and arguments)
    pub build: Option<Vec<String>>,
}
