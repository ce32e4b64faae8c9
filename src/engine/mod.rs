//! engine
//!
//! The operations behind the commands.
//!
//! # Modules
//!
//! - [`outgoing`] - Base-commit resolution for diff-producing commands
//! - [`update`] - Self-update of the installed tooling
//!
//! Both work against the [`crate::git::RevisionStore`] capability rather
//! than a concrete repository, and report failures as typed errors; the CLI
//! layer decides how they are shown.

pub mod outgoing;
pub mod update;

pub use outgoing::{OutgoingOptions, OutgoingResolver, ResolveError};
pub use update::{SystemHost, UpdateError, UpdateHost, UpdateOrchestrator, UpdateOutcome};
