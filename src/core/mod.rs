//! core
//!
//! Core domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, BranchName, RemoteName, ResolvedBase
//! - [`personality`] - Git or Mercurial vocabulary, detected from arguments
//! - [`config`] - Tool configuration schema and loading

pub mod config;
pub mod personality;
pub mod types;
