//! git::store
//!
//! The capability surface the resolver, the updater and the diff-producing
//! subcommands need from a version-control system.
//!
//! # Design
//!
//! `RevisionStore` is object safe and `Send + Sync` so the outgoing search
//! can fan per-branch work out over scoped threads. Implementations:
//!
//! - [`crate::git::Git`] - a real repository (git2 plus the `git` CLI for
//!   network operations)
//! - [`crate::git::mock::MockStore`] - in-memory graph for tests

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::GitError;
use crate::core::types::{BranchName, BranchRef, Distance, Oid, RemoteName};

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub author_time: chrono::DateTime<chrono::Utc>,
}

/// One file's entry in a [`Diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path on the base side, `None` for added files
    pub source: Option<PathBuf>,
    /// Path on the working side, `None` for deleted files
    pub target: Option<PathBuf>,
}

/// A diff from a base commit to the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub patches: Vec<FilePatch>,
    /// Unified patch text, as `git diff` would print it
    pub text: String,
}

impl Diff {
    /// Write the patch text to `path`.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.text)
    }
}

/// Commit-graph and repository queries.
pub trait RevisionStore: Send + Sync {
    /// Root of the working tree.
    fn root(&self) -> &Path;

    /// Resolve a revision expression (`HEAD`, `origin/master`, a hash, ...).
    ///
    /// Returns `None` if it does not name a commit.
    fn resolve(&self, rev: &str) -> Result<Option<Oid>, GitError>;

    /// The commit HEAD points at.
    fn head(&self) -> Result<Oid, GitError>;

    /// Current branch, `None` when detached.
    fn current_branch(&self) -> Result<Option<BranchName>, GitError>;

    /// Upstream ref configured for `branch`, if any.
    fn upstream_for(&self, branch: &BranchName) -> Result<Option<String>, GitError>;

    /// Configured remotes.
    fn remotes(&self) -> Result<Vec<RemoteName>, GitError>;

    /// Branches advertised by `remote`, in the remote's listing order.
    fn remote_branches(&self, remote: &RemoteName) -> Result<Vec<BranchRef>, GitError>;

    /// URL used to fetch from `remote`.
    fn pull_path(&self, remote: &RemoteName) -> Result<String, GitError>;

    /// Fetch `branch` from `uri` into the local object store and return its head.
    fn fetch(&self, uri: &str, branch: &BranchRef) -> Result<Oid, GitError>;

    /// Most recent common ancestor, `None` for unrelated histories.
    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError>;

    /// Commits reachable from `to` but not from `from`, newest first.
    fn commit_metadata(&self, from: &Oid, to: &Oid) -> Result<Vec<CommitInfo>, GitError>;

    /// Number of commits reachable from `to` but not from `from`.
    ///
    /// Stores with a cheaper ancestry count should override this.
    fn distance(&self, from: &Oid, to: &Oid) -> Result<Distance, GitError> {
        Ok(self.commit_metadata(from, to)?.len())
    }

    /// All values of a configuration key, empty if unset.
    fn config(&self, key: &str) -> Result<Vec<String>, GitError>;

    /// Pull the current branch from its upstream.
    fn pull(&self) -> Result<(), GitError>;

    /// Diff `base` against the working tree, limited to `paths` if non-empty.
    fn diff(&self, base: &Oid, paths: &[PathBuf]) -> Result<Diff, GitError>;
}
