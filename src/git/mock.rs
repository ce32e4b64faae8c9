//! git::mock
//!
//! In-memory [`RevisionStore`] for deterministic tests.
//!
//! # Design
//!
//! The mock keeps a small commit DAG and answers merge-base and distance
//! queries from it, so tests describe histories instead of canned answers.
//! Every call is recorded, and individual operations can be made to fail.
//!
//! # Example
//!
//! ```
//! use skara::git::mock::MockStore;
//! use skara::git::RevisionStore;
//!
//! let store = MockStore::new();
//! let root = store.commit(&[]);
//! let tip = store.commit(&[&root]);
//! store.set_head(&tip);
//!
//! assert_eq!(store.merge_base(&root, &tip).unwrap(), Some(root.clone()));
//! assert_eq!(store.distance(&root, &tip).unwrap(), 1);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::store::{CommitInfo, Diff, RevisionStore};
use super::GitError;
use crate::core::types::{BranchName, BranchRef, Oid, RemoteName};

/// Which operation should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    /// Fail fetching this branch.
    Fetch(String),
    /// Fail listing branches of any remote.
    RemoteBranches,
    /// Fail pulling with this message.
    Pull(String),
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Resolve { rev: String },
    RemoteBranches { remote: String },
    Fetch { uri: String, branch: String },
    MergeBase { a: Oid, b: Oid },
    Config { key: String },
    Pull,
    Diff { base: Oid, paths: Vec<PathBuf> },
}

/// Mock revision store.
///
/// Clones share state, so a test can keep a handle after boxing one.
#[derive(Debug, Clone)]
pub struct MockStore {
    root: PathBuf,
    inner: Arc<Mutex<MockStoreInner>>,
}

#[derive(Debug)]
struct MockStoreInner {
    next_commit: u64,
    parents: HashMap<Oid, Vec<Oid>>,
    head: Option<Oid>,
    current_branch: Option<BranchName>,
    upstreams: HashMap<BranchName, String>,
    refs: HashMap<String, Oid>,
    remotes: Vec<(RemoteName, String)>,
    remote_branches: HashMap<RemoteName, Vec<(BranchName, Oid)>>,
    config: HashMap<String, Vec<String>>,
    pulled_heads: VecDeque<Oid>,
    diff: Diff,
    fail_on: Vec<FailOn>,
    operations: Vec<MockOperation>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Create an empty store rooted at `/mock`.
    pub fn new() -> Self {
        Self::with_root("/mock")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inner: Arc::new(Mutex::new(MockStoreInner {
                next_commit: 1,
                parents: HashMap::new(),
                head: None,
                current_branch: None,
                upstreams: HashMap::new(),
                refs: HashMap::new(),
                remotes: Vec::new(),
                remote_branches: HashMap::new(),
                config: HashMap::new(),
                pulled_heads: VecDeque::new(),
                diff: Diff::default(),
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockStoreInner> {
        self.inner.lock().unwrap()
    }

    /// Add a commit with the given parents and return its id.
    pub fn commit(&self, parents: &[&Oid]) -> Oid {
        let mut inner = self.lock();
        let oid = Oid::new(format!("{:040x}", inner.next_commit)).unwrap();
        inner.next_commit += 1;
        inner
            .parents
            .insert(oid.clone(), parents.iter().map(|p| (*p).clone()).collect());
        oid
    }

    /// Add a linear chain of `len` commits on top of `base`; returns the tip.
    pub fn chain(&self, base: &Oid, len: usize) -> Oid {
        let mut tip = base.clone();
        for _ in 0..len {
            tip = self.commit(&[&tip]);
        }
        tip
    }

    pub fn set_head(&self, oid: &Oid) {
        self.lock().head = Some(oid.clone());
    }

    pub fn set_current_branch(&self, name: &str) {
        self.lock().current_branch = Some(BranchName::new(name).unwrap());
    }

    pub fn set_upstream(&self, branch: &str, upstream: &str) {
        self.lock()
            .upstreams
            .insert(BranchName::new(branch).unwrap(), upstream.to_string());
    }

    /// Make `rev` resolvable to `oid`.
    pub fn set_ref(&self, rev: &str, oid: &Oid) {
        self.lock().refs.insert(rev.to_string(), oid.clone());
    }

    pub fn add_remote(&self, name: &str, url: &str) {
        self.lock()
            .remotes
            .push((RemoteName::new(name).unwrap(), url.to_string()));
    }

    /// Advertise `branch` on `remote` with head `oid`, after any existing ones.
    pub fn add_remote_branch(&self, remote: &str, branch: &str, oid: &Oid) {
        self.lock()
            .remote_branches
            .entry(RemoteName::new(remote).unwrap())
            .or_default()
            .push((BranchName::new(branch).unwrap(), oid.clone()));
    }

    pub fn set_config(&self, key: &str, values: &[&str]) {
        self.lock().config.insert(
            key.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
    }

    /// Queue the head the next `pull` moves to.
    pub fn queue_pull(&self, oid: &Oid) {
        self.lock().pulled_heads.push_back(oid.clone());
    }

    pub fn set_diff(&self, diff: Diff) {
        self.lock().diff = diff;
    }

    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on.push(fail_on);
        self
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::Fetch { .. }))
            .count()
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }
}

impl MockStoreInner {
    /// `oid` and all its ancestors in breadth-first order.
    fn ancestors(&self, oid: &Oid) -> Vec<Oid> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([oid.clone()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&next) {
                queue.extend(parents.iter().cloned());
            }
            order.push(next);
        }
        order
    }

    fn head(&self) -> Result<Oid, GitError> {
        self.head.clone().ok_or_else(|| GitError::RefNotFound {
            refname: "HEAD".to_string(),
        })
    }
}

impl RevisionStore for MockStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rev: &str) -> Result<Option<Oid>, GitError> {
        self.record(MockOperation::Resolve {
            rev: rev.to_string(),
        });
        let inner = self.lock();
        if rev == "HEAD" {
            return Ok(inner.head.clone());
        }
        Ok(inner.refs.get(rev).cloned())
    }

    fn head(&self) -> Result<Oid, GitError> {
        self.lock().head()
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        Ok(self.lock().current_branch.clone())
    }

    fn upstream_for(&self, branch: &BranchName) -> Result<Option<String>, GitError> {
        Ok(self.lock().upstreams.get(branch).cloned())
    }

    fn remotes(&self) -> Result<Vec<RemoteName>, GitError> {
        Ok(self
            .lock()
            .remotes
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn remote_branches(&self, remote: &RemoteName) -> Result<Vec<BranchRef>, GitError> {
        self.record(MockOperation::RemoteBranches {
            remote: remote.to_string(),
        });
        let inner = self.lock();
        if inner.fail_on.contains(&FailOn::RemoteBranches) {
            return Err(GitError::CommandFailed {
                command: format!("git ls-remote --heads {}", remote),
                message: "fatal: unable to access remote".to_string(),
            });
        }
        Ok(inner
            .remote_branches
            .get(remote)
            .map(|branches| {
                branches
                    .iter()
                    .map(|(name, _)| BranchRef::new(remote.clone(), name.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn pull_path(&self, remote: &RemoteName) -> Result<String, GitError> {
        self.lock()
            .remotes
            .iter()
            .find(|(name, _)| name == remote)
            .map(|(_, url)| url.clone())
            .ok_or_else(|| GitError::RemoteNotFound {
                name: remote.to_string(),
            })
    }

    fn fetch(&self, uri: &str, branch: &BranchRef) -> Result<Oid, GitError> {
        let branch = &branch.name;
        self.record(MockOperation::Fetch {
            uri: uri.to_string(),
            branch: branch.to_string(),
        });
        let inner = self.lock();
        if inner.fail_on.contains(&FailOn::Fetch(branch.to_string())) {
            return Err(GitError::CommandFailed {
                command: format!("git fetch {} {}", uri, branch),
                message: format!("fatal: couldn't find remote ref {}", branch),
            });
        }
        let remote = inner
            .remotes
            .iter()
            .find(|(_, url)| url == uri)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| GitError::RemoteNotFound {
                name: uri.to_string(),
            })?;
        inner
            .remote_branches
            .get(&remote)
            .and_then(|branches| branches.iter().find(|(name, _)| name == branch))
            .map(|(_, oid)| oid.clone())
            .ok_or_else(|| GitError::RefNotFound {
                refname: format!("refs/heads/{}", branch),
            })
    }

    fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        self.record(MockOperation::MergeBase {
            a: a.clone(),
            b: b.clone(),
        });
        let inner = self.lock();
        let from_a: HashSet<Oid> = inner.ancestors(a).into_iter().collect();
        let common: Vec<Oid> = inner
            .ancestors(b)
            .into_iter()
            .filter(|oid| from_a.contains(oid))
            .collect();
        // Best common ancestor: not reachable from any other common ancestor.
        Ok(common
            .iter()
            .find(|candidate| {
                !common
                    .iter()
                    .any(|other| other != *candidate && inner.ancestors(other).contains(candidate))
            })
            .cloned())
    }

    fn commit_metadata(&self, from: &Oid, to: &Oid) -> Result<Vec<CommitInfo>, GitError> {
        let inner = self.lock();
        let hidden: HashSet<Oid> = inner.ancestors(from).into_iter().collect();
        Ok(inner
            .ancestors(to)
            .into_iter()
            .filter(|oid| !hidden.contains(oid))
            .map(|oid| CommitInfo {
                summary: format!("commit {}", oid.short(7)),
                oid,
                author_name: "Mock Author".to_string(),
                author_email: "mock@example.com".to_string(),
                author_time: chrono::DateTime::UNIX_EPOCH,
            })
            .collect())
    }

    fn config(&self, key: &str) -> Result<Vec<String>, GitError> {
        self.record(MockOperation::Config {
            key: key.to_string(),
        });
        Ok(self.lock().config.get(key).cloned().unwrap_or_default())
    }

    fn pull(&self) -> Result<(), GitError> {
        self.record(MockOperation::Pull);
        let mut inner = self.lock();
        let failure = inner.fail_on.iter().find_map(|f| match f {
            FailOn::Pull(message) => Some(message.clone()),
            _ => None,
        });
        if let Some(message) = failure {
            return Err(GitError::CommandFailed {
                command: "git pull --quiet".to_string(),
                message,
            });
        }
        if let Some(next) = inner.pulled_heads.pop_front() {
            inner.head = Some(next);
        }
        Ok(())
    }

    fn diff(&self, base: &Oid, paths: &[PathBuf]) -> Result<Diff, GitError> {
        self.record(MockOperation::Diff {
            base: base.clone(),
            paths: paths.to_vec(),
        });
        Ok(self.lock().diff.clone())
    }
}
