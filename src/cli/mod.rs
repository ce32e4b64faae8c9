//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Route `git skara <command>` to the registered entry point
//! - Parse arguments of the in-process subcommands
//! - Report failures as `error: ...` and turn them into exit codes
//!
//! Resolution and update logic live in [`crate::engine`].

pub mod args;
pub mod commands;
pub mod dispatch;

pub use args::JackpotArgs;
pub use dispatch::{CommandRegistry, DispatchError, Dispatcher, EntryPoint};

use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};
use anyhow::Result;

/// Run the CLI application and return the exit code.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<i32> {
    // A broken config file must not take help and version down with it.
    let config = Config::load().unwrap_or_else(|err| {
        output::warn(format!("{}, using defaults", err), Verbosity::Normal);
        Config::default()
    });
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    let argv: Vec<String> = std::env::args().skip(1).collect();
    Ok(commands::dispatcher(&config).dispatch(&argv))
}
