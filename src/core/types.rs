//! core::types
//!
//! Strong types for the revision-graph concepts the resolver works with.
//!
//! # Types
//!
//! - [`Oid`] - Commit identifier (SHA-1 or SHA-256 hex)
//! - [`BranchName`] - Validated branch name
//! - [`RemoteName`] - Name of a configured remote
//! - [`BranchRef`] - A branch on a remote
//! - [`ResolvedBase`] - The base commit chosen for a diff, with provenance
//!
//! # Examples
//!
//! ```
//! use skara::core::types::{BranchName, Oid};
//!
//! let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
//! assert_eq!(oid.short(7), "abc123d");
//!
//! assert!(BranchName::new("feature/outgoing").is_ok());
//! assert!(BranchName::new("bad..name").is_err());
//! ```

use std::fmt;

use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid remote name: {0}")]
    InvalidRemoteName(String),
}

/// Number of commits between a merge-base and the local head.
///
/// Only ever compared, never persisted.
pub type Distance = usize;

/// A commit identifier.
///
/// Normalized to lowercase; equality is exact. No ordering is implied,
/// ancestry questions go through the revision store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(String);

impl Oid {
    /// Create a validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` unless the input is 40 or 64 hex digits.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!("'{oid}' is not hexadecimal")));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form, at most `len` characters.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated branch name.
///
/// Applies the subset of `git check-ref-format` rules that matter for names
/// we build refspecs from: no empty names or components, no leading `-` or
/// `.`, no `..`, `@{`, `.lock` suffixes, whitespace, control characters or
/// refspec metacharacters.
///
/// # Example
///
/// ```
/// use skara::core::types::BranchName;
///
/// assert_eq!(BranchName::new("jdk/master").unwrap().as_str(), "jdk/master");
/// assert!(BranchName::new("-rf").is_err());
/// assert!(BranchName::new("topic.lock").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let invalid = |why: &str| Err(TypeError::InvalidBranchName(format!("'{name}': {why}")));

        if name.is_empty() || name == "@" {
            return invalid("reserved or empty");
        }
        if name.starts_with('-') {
            return invalid("cannot start with '-'");
        }
        if name.contains("..") || name.contains("@{") {
            return invalid("cannot contain '..' or '@{'");
        }
        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if name
            .chars()
            .any(|c| c.is_ascii_control() || INVALID_CHARS.contains(&c))
        {
            return invalid("contains a forbidden character");
        }
        for component in name.split('/') {
            if component.is_empty() {
                return invalid("empty path component");
            }
            if component.starts_with('.') || component.ends_with(".lock") {
                return invalid("component starts with '.' or ends with '.lock'");
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a configured remote, e.g. `origin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteName(String);

impl RemoteName {
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidRemoteName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for RemoteName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// A branch as advertised by a remote.
///
/// Carries no commit: the head is only known after the branch is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchRef {
    pub remote: RemoteName,
    pub name: BranchName,
}

impl BranchRef {
    pub fn new(remote: RemoteName, name: BranchName) -> Self {
        Self { remote, name }
    }
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.name)
    }
}

/// How a [`ResolvedBase`] was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// The user named the revision.
    Explicit(String),
    /// Outgoing comparison disabled; the local head itself.
    Head,
    /// The current branch's configured upstream.
    Upstream(String),
    /// Nearest merge-base found by the outgoing search.
    MergeBase {
        branch: BranchRef,
        distance: Distance,
    },
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Explicit(rev) => write!(f, "explicit revision '{rev}'"),
            Provenance::Head => f.write_str("HEAD"),
            Provenance::Upstream(refname) => write!(f, "upstream {refname}"),
            Provenance::MergeBase { branch, distance } => {
                write!(f, "merge-base with {branch} ({distance} commits ahead)")
            }
        }
    }
}

/// The single commit a diff-producing command compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBase {
    pub commit: Oid,
    pub provenance: Provenance,
}
