//! git
//!
//! The revision store: every repository read and write goes through here.
//!
//! # Architecture
//!
//! [`RevisionStore`] is the capability surface the rest of the crate is
//! written against. [`Git`] implements it for real repositories and is the
//! only place that imports `git2` or spawns `git`; [`mock::MockStore`]
//! implements it in memory for tests.
//!
//! # Example
//!
//! ```ignore
//! use skara::git::{Git, RevisionStore};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! for remote in git.remotes()? {
//!     println!("{} -> {}", remote, git.pull_path(&remote)?);
//! }
//! ```

mod interface;
pub mod mock;
mod store;

pub use interface::{outgoing_ref, Git, GitError, OUTGOING_REF_PREFIX};
pub use store::{CommitInfo, Diff, FilePatch, RevisionStore};
