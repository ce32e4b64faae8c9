//! External subcommands
//!
//! Suite commands that ship as their own executables. `git skara webrev`
//! runs `git-webrev` from `PATH` with the forwarded arguments and exits with
//! its status.

use std::process::Command;

use anyhow::{Context as _, Result};

use crate::cli::dispatch::EntryPoint;

/// Commands delegated to `git-<name>` executables.
pub const EXTERNAL_COMMANDS: [&str; 12] = [
    "defpath",
    "fork",
    "info",
    "jcheck",
    "openjdk-import",
    "pr",
    "publish",
    "sync",
    "token",
    "translate",
    "verify-import",
    "webrev",
];

/// Runs an external program with the forwarded arguments.
#[derive(Debug, Clone)]
pub struct External {
    program: String,
}

impl External {
    /// Delegate for `git-<name>`.
    pub fn new(name: &str) -> Self {
        Self::with_program(format!("git-{}", name))
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl EntryPoint for External {
    fn run(&self, args: &[String]) -> Result<i32> {
        tracing::debug!(program = %self.program, ?args, "running external command");
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .with_context(|| format!("could not run '{}'", self.program))?;
        Ok(status.code().unwrap_or(1))
    }
}
