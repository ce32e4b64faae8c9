//! ui
//!
//! User-facing output.
//!
//! Progress and results go to stdout; errors and warnings go to stderr with
//! an `error:`/`warning:` prefix. Diagnostic logging is separate and goes
//! through `tracing` (see [`crate::telemetry`]).

pub mod output;
