//! Skara - entry point and shared plumbing for the Skara git tooling
//!
//! `git skara <command>` routes to the suite's subcommands, resolves the
//! base commit diff-producing commands compare against, and updates the
//! installed tooling in place.
//!
//! # Architecture
//!
//! - [`cli`] - Command routing, help/version, subcommand argument parsing
//! - [`engine`] - Outgoing-base resolution and self-update
//! - [`core`] - Domain types, personality, tool configuration
//! - [`git`] - The revision store: real repositories and an in-memory mock
//! - [`ui`] - User-facing output
//! - [`telemetry`] - Diagnostic logging

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod telemetry;
pub mod ui;
