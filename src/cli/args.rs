//! cli::args
//!
//! Argument definitions for subcommands implemented in-process, using clap
//! derive.
//!
//! The top level (`git skara <command>`) is routed by
//! [`crate::cli::dispatch`]; each subcommand parses its own forwarded
//! arguments.

use clap::Parser;
use std::path::PathBuf;

/// Run the Jackpot static analyzer over outgoing changes
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "git jackpot", disable_version_flag = true)]
pub struct JackpotArgs {
    /// Compare against a specified revision
    #[arg(short, long, value_name = "REV")]
    pub rev: Option<String>,

    /// Use remote to calculate outgoing changes
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,

    /// Deprecated: force use of mercurial
    #[arg(short, long, hide = true)]
    pub mercurial: bool,

    /// Do not compare against remote, use only 'status'
    #[arg(short = 'N', long)]
    pub no_outgoing: bool,

    /// Print the version of this tool
    #[arg(short, long)]
    pub version: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// File listing the paths to analyze, one per line ('-' for stdin)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl JackpotArgs {
    /// Parse forwarded arguments.
    pub fn try_parse_args(args: &[String]) -> Result<Self, clap::Error> {
        Self::try_parse_from(std::iter::once("git jackpot").chain(args.iter().map(String::as_str)))
    }
}
