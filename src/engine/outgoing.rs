//! engine::outgoing
//!
//! Choose the base commit a diff-producing command compares against.
//!
//! # Resolution order
//!
//! 1. An explicit revision, if given.
//! 2. `HEAD`, if outgoing comparison is disabled by flag or by the
//!    `webrev.no-outgoing` config key.
//! 3. The upstream configured for the current branch.
//! 4. The outgoing search: fetch every branch of the selected remote and
//!    take the merge-base with the local head that has the fewest commits
//!    between it and the head.
//!
//! # Determinism
//!
//! The search keeps the first candidate with the strictly smallest
//! distance, in the remote's listing order. Per-branch work may run on
//! several threads; results are joined back into listing order before the
//! reduction, so the winner does not depend on `jobs`.
//!
//! # Example
//!
//! ```
//! use skara::engine::outgoing::{OutgoingOptions, OutgoingResolver};
//! use skara::git::mock::MockStore;
//!
//! let store = MockStore::new();
//! let root = store.commit(&[]);
//! let head = store.chain(&root, 2);
//! store.set_head(&head);
//! store.add_remote("origin", "https://example.org/repo.git");
//! store.add_remote_branch("origin", "master", &root);
//!
//! let base = OutgoingResolver::new(&store)
//!     .resolve(&OutgoingOptions::default())
//!     .unwrap();
//! assert_eq!(base.commit, root);
//! ```

use std::thread;

use thiserror::Error;

use crate::core::config::DEFAULT_OUTGOING_JOBS;
use crate::core::types::{BranchRef, Distance, Oid, Provenance, RemoteName, ResolvedBase};
use crate::git::{GitError, RevisionStore};

/// Config key that disables outgoing comparison.
pub const NO_OUTGOING_KEY: &str = "webrev.no-outgoing";

/// Config key naming the remote to search.
pub const REMOTE_KEY: &str = "webrev.remote";

/// Remote preferred when several are configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Errors from base resolution. All are fatal to the calling command.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A revision did not name a commit.
    #[error("could not resolve reference '{reference}'")]
    UnresolvedReference { reference: String },

    /// No remote could be picked automatically.
    #[error("{}", ambiguous_remote_message(.remotes))]
    AmbiguousRemote { remotes: Vec<RemoteName> },

    /// The selected remote offered nothing to compare against.
    #[error("no branch on remote '{remote}' to compare against")]
    NoCandidateRevision { remote: RemoteName },

    #[error(transparent)]
    Store(#[from] GitError),
}

fn ambiguous_remote_message(remotes: &[RemoteName]) -> String {
    if remotes.is_empty() {
        "no remotes present, cannot figure out outgoing changes".to_string()
    } else {
        let names: Vec<_> = remotes.iter().map(RemoteName::as_str).collect();
        format!(
            "multiple remotes without {} remote present ({}), cannot figure out outgoing changes",
            DEFAULT_REMOTE,
            names.join(", ")
        )
    }
}

/// User-supplied overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingOptions {
    /// Compare against this revision
    pub rev: Option<String>,
    /// Search this remote
    pub remote: Option<String>,
    /// Compare against HEAD
    pub no_outgoing: bool,
    /// Remote branches examined concurrently (1 = sequential)
    pub jobs: usize,
}

impl Default for OutgoingOptions {
    fn default() -> Self {
        Self {
            rev: None,
            remote: None,
            no_outgoing: false,
            jobs: DEFAULT_OUTGOING_JOBS,
        }
    }
}

/// Whether a config value switches a boolean key on.
///
/// Accepts `true`, `on`, `1` and `enabled` in any case.
pub fn is_enabled(value: &str) -> bool {
    ["true", "on", "1", "enabled"]
        .iter()
        .any(|v| value.trim().eq_ignore_ascii_case(v))
}

/// A merge-base found while searching one remote branch.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    branch: BranchRef,
    merge_base: Oid,
    distance: Distance,
}

/// First candidate with the strictly smallest distance.
fn select_nearest(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.distance >= current.distance => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Resolves the base commit against a revision store.
pub struct OutgoingResolver<'a> {
    store: &'a dyn RevisionStore,
}

impl<'a> OutgoingResolver<'a> {
    pub fn new(store: &'a dyn RevisionStore) -> Self {
        Self { store }
    }

    /// Resolve the base commit.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::UnresolvedReference`] for an explicit revision or
    ///   upstream that names no commit
    /// - [`ResolveError::AmbiguousRemote`] when the remote cannot be picked
    /// - [`ResolveError::NoCandidateRevision`] when the remote has no usable
    ///   branch
    /// - [`ResolveError::Store`] for any store failure, including a failed
    ///   fetch of a single candidate branch
    pub fn resolve(&self, options: &OutgoingOptions) -> Result<ResolvedBase, ResolveError> {
        if let Some(rev) = &options.rev {
            return Ok(ResolvedBase {
                commit: self.resolve_rev(rev)?,
                provenance: Provenance::Explicit(rev.clone()),
            });
        }

        if options.no_outgoing || self.no_outgoing_configured()? {
            tracing::debug!("outgoing comparison disabled, using HEAD");
            return Ok(ResolvedBase {
                commit: self.resolve_rev("HEAD")?,
                provenance: Provenance::Head,
            });
        }

        if let Some(upstream) = self.upstream()? {
            tracing::debug!(%upstream, "using upstream of current branch");
            return Ok(ResolvedBase {
                commit: self.resolve_rev(&upstream)?,
                provenance: Provenance::Upstream(upstream),
            });
        }

        self.search(options)
    }

    fn resolve_rev(&self, rev: &str) -> Result<Oid, ResolveError> {
        self.store
            .resolve(rev)?
            .ok_or_else(|| ResolveError::UnresolvedReference {
                reference: rev.to_string(),
            })
    }

    fn no_outgoing_configured(&self) -> Result<bool, ResolveError> {
        Ok(match self.store.config(NO_OUTGOING_KEY)?.as_slice() {
            [value] => is_enabled(value),
            _ => false,
        })
    }

    fn upstream(&self) -> Result<Option<String>, ResolveError> {
        match self.store.current_branch()? {
            Some(branch) => Ok(self.store.upstream_for(&branch)?),
            None => Ok(None),
        }
    }

    /// Pick the remote to search.
    fn select_remote(&self, explicit: Option<&str>) -> Result<RemoteName, ResolveError> {
        if let Some(name) = explicit {
            return Ok(RemoteName::new(name).map_err(GitError::from)?);
        }

        if let [name] = self.store.config(REMOTE_KEY)?.as_slice() {
            return Ok(RemoteName::new(name.as_str()).map_err(GitError::from)?);
        }

        let remotes = self.store.remotes()?;
        if let [only] = remotes.as_slice() {
            return Ok(only.clone());
        }
        if let Some(origin) = remotes.iter().find(|r| **r == *DEFAULT_REMOTE) {
            return Ok(origin.clone());
        }
        Err(ResolveError::AmbiguousRemote { remotes })
    }

    fn search(&self, options: &OutgoingOptions) -> Result<ResolvedBase, ResolveError> {
        let remote = self.select_remote(options.remote.as_deref())?;
        let head = self.store.head()?;
        let uri = self.store.pull_path(&remote)?;
        let branches = self.store.remote_branches(&remote)?;
        tracing::debug!(%remote, %uri, branches = branches.len(), "searching outgoing changes");

        let measured = self.measure_all(&uri, &head, &branches, options.jobs)?;
        let nearest = select_nearest(measured.into_iter().flatten())
            .ok_or(ResolveError::NoCandidateRevision { remote })?;

        tracing::debug!(
            branch = %nearest.branch,
            base = %nearest.merge_base,
            distance = nearest.distance,
            "selected nearest merge-base"
        );
        Ok(ResolvedBase {
            commit: nearest.merge_base,
            provenance: Provenance::MergeBase {
                branch: nearest.branch,
                distance: nearest.distance,
            },
        })
    }

    /// Measure every branch, preserving listing order in the result.
    fn measure_all(
        &self,
        uri: &str,
        head: &Oid,
        branches: &[BranchRef],
        jobs: usize,
    ) -> Result<Vec<Option<Candidate>>, GitError> {
        let jobs = jobs.max(1);
        if jobs == 1 {
            return branches
                .iter()
                .map(|branch| self.measure(uri, head, branch))
                .collect();
        }

        let mut measured = Vec::with_capacity(branches.len());
        for batch in branches.chunks(jobs) {
            let results: Vec<Result<Option<Candidate>, GitError>> = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|branch| scope.spawn(move || self.measure(uri, head, branch)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                    })
                    .collect()
            });
            for result in results {
                measured.push(result?);
            }
        }
        Ok(measured)
    }

    /// Fetch one branch and measure its merge-base with `head`.
    ///
    /// `None` when the branch shares no history with `head`.
    fn measure(
        &self,
        uri: &str,
        head: &Oid,
        branch: &BranchRef,
    ) -> Result<Option<Candidate>, GitError> {
        let fetched = self.store.fetch(uri, branch)?;
        let Some(merge_base) = self.store.merge_base(&fetched, head)? else {
            tracing::warn!(%branch, "no common history with HEAD, skipping");
            return Ok(None);
        };
        let distance = self.store.distance(&merge_base, head)?;
        tracing::debug!(%branch, %merge_base, distance, "measured candidate");
        Ok(Some(Candidate {
            branch: branch.clone(),
            merge_base,
            distance,
        }))
    }
}
