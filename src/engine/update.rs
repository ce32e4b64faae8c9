//! engine::update
//!
//! Self-update of the installed tooling.
//!
//! # Flow
//!
//! 1. Locate the installation through the personality's VCS config
//! 2. Pull the installation's repository
//! 3. Rebuild only if the pull moved HEAD
//!
//! A failed rebuild is reported but never rolled back; the pulled sources
//! stay in place.
//!
//! The host environment (VCS config, home directory, repository access and
//! the build process) sits behind [`UpdateHost`], so the orchestrator can be
//! exercised without touching the real installation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::core::config::Config;
use crate::core::personality::Personality;
use crate::core::types::Oid;
use crate::git::{Git, GitError, RevisionStore};
use crate::ui::output::{self, Verbosity};

/// Suffix of the `include.path` entry that marks the git installation.
pub const GIT_INSTALLATION_SUFFIX: &str = "skara.gitconfig";

/// Errors from an update run.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The installation could not be located or opened.
    #[error("{}", installation_not_found_message(.path))]
    InstallationNotFound { path: Option<PathBuf> },

    /// The rebuild process ran and failed.
    #[error("could not build Skara tooling")]
    RebuildFailed { status: Option<i32> },

    #[error(transparent)]
    Store(#[from] GitError),

    /// A host process could not be started.
    #[error("could not run '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

fn installation_not_found_message(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(
            "could not find skara repository at {}",
            path.display()
        ),
        None => "could not find skara repository".to_string(),
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The pull did not move HEAD.
    UpToDate,
    /// HEAD moved and the rebuild succeeded.
    Updated { from: Oid, to: Oid },
}

/// Where the tooling is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Raw value read from the VCS config
    pub config_line: String,
    /// `config_line` with `~` expanded
    pub path: PathBuf,
    /// Directory containing `path`; the repository to update
    pub root: PathBuf,
}

/// Environment the orchestrator runs against.
pub trait UpdateHost {
    /// All values of `key` in the user's VCS config for `personality`.
    fn vcs_config(&self, personality: Personality, key: &str) -> Result<Vec<String>, UpdateError>;

    /// The user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Open the repository rooted at `root`.
    fn open_store(&self, root: &Path) -> Result<Box<dyn RevisionStore>, GitError>;

    /// Rebuild the tooling in `root`, returning the exit code.
    ///
    /// `None` means the process was terminated by a signal.
    fn rebuild(&self, root: &Path) -> Result<Option<i32>, UpdateError>;
}

/// Expand a leading `~` to `home`.
pub fn expand_home(value: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(value);
    };
    if value == "~" {
        return home.to_path_buf();
    }
    match value
        .strip_prefix("~/")
        .or_else(|| value.strip_prefix("~\\"))
    {
        Some(rest) => home.join(rest),
        None => PathBuf::from(value),
    }
}

/// Runs one update.
pub struct UpdateOrchestrator<'a> {
    personality: Personality,
    host: &'a dyn UpdateHost,
    verbosity: Verbosity,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(personality: Personality, host: &'a dyn UpdateHost) -> Self {
        Self {
            personality,
            host,
            verbosity: Verbosity::Normal,
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Find the installation from the VCS config.
    pub fn locate(&self) -> Result<Installation, UpdateError> {
        let key = self.personality.installation_key();
        let values = self.host.vcs_config(self.personality, key)?;
        tracing::debug!(key, ?values, "read installation config");

        let config_line = match self.personality {
            Personality::Git => values
                .into_iter()
                .find(|value| value.trim_end().ends_with(GIT_INSTALLATION_SUFFIX)),
            Personality::Mercurial => match <[String; 1]>::try_from(values) {
                Ok([value]) => Some(value),
                Err(_) => None,
            },
        }
        .map(|value| value.trim().to_string())
        .ok_or(UpdateError::InstallationNotFound { path: None })?;

        let home = self.host.home_dir();
        let path = expand_home(&config_line, home.as_deref());
        let root = path
            .parent()
            .filter(|parent| parent.is_dir())
            .map(Path::to_path_buf)
            .ok_or_else(|| UpdateError::InstallationNotFound {
                path: Some(path.clone()),
            })?;

        Ok(Installation {
            config_line,
            path,
            root,
        })
    }

    /// Pull and, if anything changed, rebuild.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::InstallationNotFound`] if the installation cannot be
    ///   located or its directory is not a repository
    /// - [`UpdateError::Store`] if the pull fails
    /// - [`UpdateError::RebuildFailed`] if the rebuild exits unsuccessfully
    pub fn run(&self) -> Result<UpdateOutcome, UpdateError> {
        let installation = self.locate()?;
        let store = self.host.open_store(&installation.root).map_err(|err| {
            tracing::debug!(root = %installation.root.display(), %err, "cannot open installation");
            UpdateError::InstallationNotFound {
                path: Some(installation.root.clone()),
            }
        })?;

        let before = store.head()?;
        output::print("Checking for updates ...", self.verbosity);
        store.pull()?;
        let after = store.head()?;

        if before == after {
            output::print("no updates found", self.verbosity);
            return Ok(UpdateOutcome::UpToDate);
        }

        tracing::info!(from = %before, to = %after, "installation updated");
        output::print("updates downloaded", self.verbosity);
        output::print("Rebuilding ...", self.verbosity);

        let status = self.host.rebuild(&installation.root)?;
        if status != Some(0) {
            return Err(UpdateError::RebuildFailed { status });
        }
        Ok(UpdateOutcome::Updated {
            from: before,
            to: after,
        })
    }
}

/// The real environment: `git`/`hg` on `PATH`, the gradle wrapper.
#[derive(Debug, Clone, Default)]
pub struct SystemHost {
    build: Option<Vec<String>>,
}

impl SystemHost {
    /// Host using the build command override from `config`, if any.
    pub fn from_config(config: &Config) -> Self {
        Self {
            build: config.build_command().map(<[String]>::to_vec),
        }
    }

    /// The rebuild command line.
    pub fn build_command(&self) -> Vec<String> {
        match &self.build {
            Some(build) => build.clone(),
            None if cfg!(windows) => vec!["gradlew.bat".to_string()],
            None => vec!["sh".to_string(), "gradlew".to_string()],
        }
    }
}

impl UpdateHost for SystemHost {
    fn vcs_config(&self, personality: Personality, key: &str) -> Result<Vec<String>, UpdateError> {
        let mut cmd = match personality {
            Personality::Git => {
                let mut cmd = Command::new("git");
                cmd.args(["config", "--get-all", key]);
                cmd
            }
            Personality::Mercurial => {
                let mut cmd = Command::new("hg");
                cmd.args(["config", key]);
                cmd
            }
        };
        let command = format!("{} config {}", personality.vcs(), key);
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| UpdateError::Io {
                command: command.clone(),
                source,
            })?;

        // Both tools exit 1 for an unset key.
        if !output.status.success() {
            if output.status.code() == Some(1) {
                return Ok(Vec::new());
            }
            return Err(UpdateError::Store(GitError::CommandFailed {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn open_store(&self, root: &Path) -> Result<Box<dyn RevisionStore>, GitError> {
        Ok(Box::new(Git::open(root)?))
    }

    fn rebuild(&self, root: &Path) -> Result<Option<i32>, UpdateError> {
        let build = self.build_command();
        let (program, args) = build.split_first().ok_or(UpdateError::RebuildFailed { status: None })?;
        tracing::debug!(?build, root = %root.display(), "rebuilding");

        let status = Command::new(program)
            .args(args)
            .current_dir(root)
            .status()
            .map_err(|source| UpdateError::Io {
                command: build.join(" "),
                source,
            })?;
        Ok(status.code())
    }
}
