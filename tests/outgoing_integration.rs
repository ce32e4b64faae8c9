//! Integration tests for outgoing-base resolution against real repositories.
//!
//! Each test builds an upstream repository and a clone of it, then resolves
//! the base commit from inside the clone.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use skara::core::types::{Oid, Provenance, ResolvedBase};
use skara::engine::outgoing::{OutgoingOptions, OutgoingResolver, ResolveError};
use skara::git::{Git, RevisionStore};

// =============================================================================
// Test Fixtures
// =============================================================================

struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-b", "main"]);
        configure(dir.path());
        // Unique content keeps root commits of separate repositories distinct.
        std::fs::write(
            dir.path().join("README.md"),
            format!("# {}\n", dir.path().display()),
        )
        .unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "--quiet", "-m", "Initial commit"]);
        Self { dir }
    }

    fn clone_of(upstream: &TestRepo) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let url = upstream.path().display().to_string();
        run_git(dir.path(), &["clone", "--quiet", &url, "."]);
        configure(dir.path());
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    /// Commit a new file named `name`; returns HEAD.
    fn commit(&self, name: &str, message: &str) -> Oid {
        std::fs::write(self.path().join(name), format!("{}\n", message)).unwrap();
        run_git(self.path(), &["add", name]);
        run_git(self.path(), &["commit", "--quiet", "-m", message]);
        self.head()
    }

    fn head(&self) -> Oid {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(self.path())
            .output()
            .expect("git rev-parse failed");
        Oid::new(String::from_utf8(output.stdout).unwrap().trim()).unwrap()
    }

    fn git_cmd(&self, args: &[&str]) {
        run_git(self.path(), args);
    }
}

fn configure(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// Upstream: main c0-c1-c2, feature c1-f1-f2.
/// Clone: topic (no upstream) f2-t1, checked out.
///
/// The merge-base with feature is 1 commit behind HEAD, with main 3.
struct Scenario {
    upstream: TestRepo,
    clone: TestRepo,
    fork: Oid,
    feature_tip: Oid,
}

fn scenario() -> Scenario {
    let upstream = TestRepo::new();
    let fork = upstream.commit("c1.txt", "c1");
    upstream.git_cmd(&["checkout", "--quiet", "-b", "feature"]);
    upstream.commit("f1.txt", "f1");
    let feature_tip = upstream.commit("f2.txt", "f2");
    upstream.git_cmd(&["checkout", "--quiet", "main"]);
    upstream.commit("c2.txt", "c2");

    let clone = TestRepo::clone_of(&upstream);
    clone.git_cmd(&["checkout", "--quiet", "--no-track", "-b", "topic", "origin/feature"]);
    clone.commit("t1.txt", "t1");

    Scenario {
        upstream,
        clone,
        fork,
        feature_tip,
    }
}

fn resolve(repo: &TestRepo, options: OutgoingOptions) -> Result<ResolvedBase, ResolveError> {
    let git = repo.git();
    OutgoingResolver::new(&git).resolve(&options)
}

// =============================================================================
// Outgoing search
// =============================================================================

#[test]
fn nearest_remote_branch_wins() {
    let s = scenario();

    let base = resolve(&s.clone, OutgoingOptions::default()).unwrap();

    assert_eq!(base.commit, s.feature_tip);
    match base.provenance {
        Provenance::MergeBase { branch, distance } => {
            assert_eq!(branch.to_string(), "origin/feature");
            assert_eq!(distance, 1);
        }
        other => panic!("unexpected provenance {other:?}"),
    }
}

#[test]
fn sequential_and_parallel_agree() {
    let s = scenario();
    for jobs in [1, 2, 4] {
        let base = resolve(
            &s.clone,
            OutgoingOptions {
                jobs,
                ..OutgoingOptions::default()
            },
        )
        .unwrap();
        assert_eq!(base.commit, s.feature_tip, "jobs = {jobs}");
    }
}

#[test]
fn candidate_branches_are_fetched() {
    let s = scenario();
    resolve(&s.clone, OutgoingOptions::default()).unwrap();

    let git = s.clone.git();
    assert!(git.resolve("refs/skara/outgoing/origin/main").unwrap().is_some());
    assert!(git.resolve("refs/skara/outgoing/origin/feature").unwrap().is_some());
}

#[test]
fn resolves_again_after_upstream_branch_rename() {
    let s = scenario();
    resolve(&s.clone, OutgoingOptions::default()).unwrap();

    s.upstream.git_cmd(&["branch", "-m", "feature", "feature/x"]);

    let base = resolve(&s.clone, OutgoingOptions::default()).unwrap();
    assert_eq!(base.commit, s.feature_tip);
    match base.provenance {
        Provenance::MergeBase { branch, .. } => {
            assert_eq!(branch.to_string(), "origin/feature/x")
        }
        other => panic!("unexpected provenance {other:?}"),
    }
}

#[test]
fn same_branch_path_nested_across_remotes() {
    let s = scenario();
    let other = TestRepo::clone_of(&s.upstream);
    other.git_cmd(&["branch", "feature/x", "origin/feature"]);
    s.clone.git_cmd(&["remote", "add", "other", &other.path().display().to_string()]);

    let from_origin = resolve(&s.clone, OutgoingOptions::default()).unwrap();
    let from_other = resolve(
        &s.clone,
        OutgoingOptions {
            remote: Some("other".into()),
            ..OutgoingOptions::default()
        },
    )
    .unwrap();

    assert_eq!(from_origin.commit, s.feature_tip);
    assert_eq!(from_other.commit, s.feature_tip);
}

// =============================================================================
// Overrides
// =============================================================================

#[test]
fn explicit_revision() {
    let s = scenario();

    let base = resolve(
        &s.clone,
        OutgoingOptions {
            rev: Some("origin/main~1".into()),
            ..OutgoingOptions::default()
        },
    )
    .unwrap();

    assert_eq!(base.commit, s.fork);
    assert_eq!(base.provenance, Provenance::Explicit("origin/main~1".into()));
}

#[test]
fn upstream_of_current_branch() {
    let s = scenario();
    s.clone.git_cmd(&["checkout", "--quiet", "main"]);
    let origin_main = s.clone.head();
    s.clone.commit("local.txt", "local");

    let base = resolve(&s.clone, OutgoingOptions::default()).unwrap();

    assert_eq!(base.commit, origin_main);
    assert_eq!(
        base.provenance,
        Provenance::Upstream("refs/remotes/origin/main".into())
    );
}

#[test]
fn no_outgoing_from_git_config() {
    let s = scenario();
    s.clone.git_cmd(&["config", "webrev.no-outgoing", "TRUE"]);

    let base = resolve(&s.clone, OutgoingOptions::default()).unwrap();

    assert_eq!(base.commit, s.clone.head());
    assert_eq!(base.provenance, Provenance::Head);
}

#[test]
fn remote_from_git_config() {
    let s = scenario();
    let unrelated = TestRepo::new();
    let url = unrelated.path().display().to_string();
    s.clone.git_cmd(&["remote", "add", "elsewhere", &url]);
    s.clone.git_cmd(&["config", "webrev.remote", "elsewhere"]);

    // Only `elsewhere` is searched, and it shares no history with HEAD.
    let err = resolve(&s.clone, OutgoingOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::NoCandidateRevision { remote } if remote.as_str() == "elsewhere"
    ));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn no_remotes_is_ambiguous() {
    let repo = TestRepo::new();
    repo.git_cmd(&["checkout", "--quiet", "--detach"]);

    let err = resolve(&repo, OutgoingOptions::default()).unwrap_err();
    assert!(matches!(&err, ResolveError::AmbiguousRemote { remotes } if remotes.is_empty()));
}

#[test]
fn several_remotes_without_origin_is_ambiguous() {
    let a = TestRepo::new();
    let b = TestRepo::new();
    let repo = TestRepo::new();
    repo.git_cmd(&["remote", "add", "jdk", &a.path().display().to_string()]);
    repo.git_cmd(&["remote", "add", "valhalla", &b.path().display().to_string()]);

    let err = resolve(&repo, OutgoingOptions::default()).unwrap_err();
    assert!(matches!(&err, ResolveError::AmbiguousRemote { remotes } if remotes.len() == 2));
}

#[test]
fn unknown_revision() {
    let s = scenario();
    let err = resolve(
        &s.clone,
        OutgoingOptions {
            rev: Some("no-such-rev".into()),
            ..OutgoingOptions::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "could not resolve reference 'no-such-rev'");
}
