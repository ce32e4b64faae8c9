//! ui::output
//!
//! Output formatting and display.

use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - standard output
    #[default]
    Normal,
}

impl Verbosity {
    /// Create verbosity from the quiet flag.
    pub fn from_quiet(quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("{}", format_error(message));
}

/// Print an error message followed by an indented hint.
pub fn error_with_hint(message: impl Display, hint: impl Display) {
    eprintln!("{}", format_error(message));
    eprintln!("{}", format_hint(hint));
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// `error: <message>`
pub fn format_error(message: impl Display) -> String {
    format!("error: {}", message)
}

/// A continuation line aligned under the text of an `error:` line.
pub fn format_hint(hint: impl Display) -> String {
    format!("{:width$}{}", "", hint, width = "error: ".len())
}
