//! git::interface
//!
//! Git-backed [`RevisionStore`].
//!
//! Local graph queries (ref resolution, merge-base, revwalks, diffs) go
//! through `git2`. Operations that talk to other repositories (`ls-remote`,
//! `fetch`, `pull`) and config reads run the `git` executable so they pick
//! up the user's transports, credential helpers and include files.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::RemoteNotFound`]: No such remote configured
//! - [`GitError::CommandFailed`]: A `git` subprocess failed; carries its stderr
//!
//! # Example
//!
//! ```ignore
//! use skara::git::{Git, RevisionStore};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! println!("HEAD is at {}", git.head()?.short(7));
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use super::store::{CommitInfo, Diff, FilePatch, RevisionStore};
use crate::core::types::{BranchName, BranchRef, Distance, Oid, RemoteName, TypeError};

/// Ref namespace candidate branches are fetched into.
pub const OUTGOING_REF_PREFIX: &str = "refs/skara/outgoing/";

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("{path} is not a repository")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// No remote with this name is configured.
    #[error("remote not found: {name}")]
    RemoteNotFound { name: String },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid branch or remote name.
    #[error("invalid name: {message}")]
    InvalidName {
        /// Description of the problem
        message: String,
    },

    /// A `git` subprocess failed.
    #[error("'{command}' failed: {message}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Its stderr, or the spawn error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidBranchName(msg) | TypeError::InvalidRemoteName(msg) => {
                GitError::InvalidName { message: msg }
            }
        }
    }
}

/// A Git repository with a working tree.
///
/// The git2 handle sits behind a mutex so a `Git` can be shared across the
/// outgoing search's worker threads. Subprocess calls do not take the lock.
pub struct Git {
    repo: Mutex<git2::Repository>,
    work_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl Git {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            work_dir,
        })
    }

    fn repo(&self) -> Result<MutexGuard<'_, git2::Repository>, GitError> {
        self.repo.lock().map_err(|_| GitError::Internal {
            message: "repository handle poisoned by a panicked thread".to_string(),
        })
    }

    // =========================================================================
    // Subprocesses
    // =========================================================================

    fn run_git(&self, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!(?args, cwd = %self.work_dir.display(), "running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                message: e.to_string(),
            })
    }

    /// Run git, requiring success, and return its stdout.
    fn git_stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run_git(args)?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    // =========================================================================
    // Refs and commits
    // =========================================================================

    /// Resolve a full ref name to the commit it points at.
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let repo = self.repo()?;
        let reference = repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        let oid = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?
            .id();

        Ok(Oid::new(oid.to_string())?)
    }

    /// Delete outgoing refs that `destination` would nest under or contain.
    ///
    /// A branch renamed upstream from `feature` to `feature/x` leaves a ref
    /// that git refuses to create the new one next to.
    fn clear_conflicting_refs(&self, destination: &str) -> Result<(), GitError> {
        let repo = self.repo()?;
        let mut stale = Vec::new();
        for reference in repo.references()? {
            let reference = reference?;
            let Some(name) = reference.name() else {
                continue;
            };
            if name.starts_with(OUTGOING_REF_PREFIX) && refs_conflict(name, destination) {
                stale.push(name.to_string());
            }
        }

        for name in stale {
            tracing::debug!(%name, %destination, "removing stale outgoing ref");
            match repo.find_reference(&name) {
                Ok(mut reference) => reference.delete()?,
                Err(e) if e.code() == git2::ErrorCode::NotFound => {}
                Err(e) => return Err(GitError::from_git2(e, &name)),
            }
        }
        Ok(())
    }

    /// Count commits reachable from `tip` but not from `base`.
    pub fn commit_count(&self, base: &Oid, tip: &Oid) -> Result<usize, GitError> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.push(to_git2(tip)?)?;
        revwalk.hide(to_git2(base)?)?;
        Ok(revwalk.count())
    }

    /// Get information about a commit.
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let repo = self.repo()?;
        Self::commit_info_in(&repo, oid)
    }

    fn commit_info_in(repo: &git2::Repository, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let author = commit.author();
        let author_time = chrono::DateTime::from_timestamp(author.when().seconds(), 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH);

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time,
        })
    }

    /// Parse `git ls-remote --heads` output into branch refs.
    fn parse_ls_remote(remote: &RemoteName, output: &str) -> Result<Vec<BranchRef>, GitError> {
        let mut branches = Vec::new();
        for line in output.lines() {
            let Some((_, refname)) = line.split_once('\t') else {
                continue;
            };
            if let Some(name) = refname.trim().strip_prefix("refs/heads/") {
                branches.push(BranchRef::new(remote.clone(), BranchName::new(name)?));
            }
        }
        Ok(branches)
    }
}

/// Ref a remote branch is fetched into: `refs/skara/outgoing/<remote>/<branch>`.
pub fn outgoing_ref(branch: &BranchRef) -> String {
    format!("{}{}/{}", OUTGOING_REF_PREFIX, branch.remote, branch.name)
}

/// True when one ref name is a directory prefix of the other.
fn refs_conflict(a: &str, b: &str) -> bool {
    fn nested(outer: &str, inner: &str) -> bool {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.starts_with('/'))
    }
    nested(a, b) || nested(b, a)
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn from_git2(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

impl RevisionStore for Git {
    fn root(&self) -> &Path {
        &self.work_dir
    }

    fn resolve(&self, rev: &str) -> Result<Option<Oid>, GitError> {
        let repo = self.repo()?;
        let object = match repo.revparse_single(rev) {
            Ok(object) => object,
            Err(e) => {
                return match e.code() {
                    git2::ErrorCode::NotFound
                    | git2::ErrorCode::InvalidSpec
                    | git2::ErrorCode::Ambiguous => Ok(None),
                    _ => Err(GitError::from_git2(e, rev)),
                }
            }
        };

        let resolved = match object.peel_to_commit() {
            Ok(commit) => Ok(Some(from_git2(commit.id())?)),
            Err(e) if e.code() == git2::ErrorCode::Peel || e.code() == git2::ErrorCode::InvalidSpec => {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, rev)),
        };
        resolved
    }

    fn head(&self) -> Result<Oid, GitError> {
        let repo = self.repo()?;
        let head = repo.head().map_err(|e| GitError::from_git2(e, "HEAD"))?;
        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();
        from_git2(oid)
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let repo = self.repo()?;
        let head = match repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }

        Ok(None)
    }

    fn upstream_for(&self, branch: &BranchName) -> Result<Option<String>, GitError> {
        let repo = self.repo()?;
        let refname = format!("refs/heads/{}", branch);
        match repo.branch_upstream_name(&refname) {
            Ok(buf) => Ok(buf.as_str().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, &refname)),
        }
    }

    fn remotes(&self) -> Result<Vec<RemoteName>, GitError> {
        let repo = self.repo()?;
        let names = repo.remotes()?;
        names
            .iter()
            .flatten()
            .map(|name| RemoteName::new(name).map_err(GitError::from))
            .collect()
    }

    fn remote_branches(&self, remote: &RemoteName) -> Result<Vec<BranchRef>, GitError> {
        let output = self.git_stdout(&["ls-remote", "--heads", remote.as_str()])?;
        Self::parse_ls_remote(remote, &output)
    }

    fn pull_path(&self, remote: &RemoteName) -> Result<String, GitError> {
        let repo = self.repo()?;
        let found = match repo.find_remote(remote.as_str()) {
            Ok(found) => found,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(GitError::RemoteNotFound {
                    name: remote.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        found
            .url()
            .map(String::from)
            .ok_or_else(|| GitError::RemoteNotFound {
                name: remote.to_string(),
            })
    }

    fn fetch(&self, uri: &str, branch: &BranchRef) -> Result<Oid, GitError> {
        // Each branch gets its own destination ref so concurrent fetches
        // never share FETCH_HEAD.
        let destination = outgoing_ref(branch);
        self.clear_conflicting_refs(&destination)?;
        let refspec = format!("+refs/heads/{}:{}", branch.name, destination);
        self.git_stdout(&[
            "fetch",
            "--quiet",
            "--no-tags",
            "--no-write-fetch-head",
            uri,
            &refspec,
        ])?;
        self.resolve_ref(&destination)
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        let repo = self.repo()?;
        match repo.merge_base(to_git2(a)?, to_git2(b)?) {
            Ok(oid) => Ok(Some(from_git2(oid)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn commit_metadata(&self, from: &Oid, to: &Oid) -> Result<Vec<CommitInfo>, GitError> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.push(to_git2(to)?)?;
        revwalk.hide(to_git2(from)?)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            commits.push(Self::commit_info_in(&repo, &from_git2(oid?)?)?);
        }
        Ok(commits)
    }

    fn distance(&self, from: &Oid, to: &Oid) -> Result<Distance, GitError> {
        self.commit_count(from, to)
    }

    fn config(&self, key: &str) -> Result<Vec<String>, GitError> {
        let args = ["config", "--get-all", key];
        let output = self.run_git(&args)?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(String::from)
                .collect()),
            // git config exits 1 when the key is unset
            Some(1) => Ok(Vec::new()),
            _ => Err(GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn pull(&self) -> Result<(), GitError> {
        self.git_stdout(&["pull", "--quiet"])?;
        Ok(())
    }

    fn diff(&self, base: &Oid, paths: &[PathBuf]) -> Result<Diff, GitError> {
        let repo = self.repo()?;
        let commit = repo
            .find_commit(to_git2(base)?)
            .map_err(|e| GitError::from_git2(e, base.as_str()))?;
        let tree = commit.tree()?;

        let mut opts = git2::DiffOptions::new();
        for path in paths {
            opts.pathspec(path.as_path());
        }
        let diff = repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?;

        let patches = diff
            .deltas()
            .map(|delta| FilePatch {
                source: match delta.status() {
                    git2::Delta::Added | git2::Delta::Untracked => None,
                    _ => delta.old_file().path().map(Path::to_path_buf),
                },
                target: match delta.status() {
                    git2::Delta::Deleted => None,
                    _ => delta.new_file().path().map(Path::to_path_buf),
                },
            })
            .collect();

        let mut text = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            // File and hunk headers carry their own text; content lines
            // need the origin marker put back.
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        Ok(Diff { patches, text })
    }
}
