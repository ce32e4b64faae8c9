//! core::personality
//!
//! The two presentation modes of the dispatcher.
//!
//! The same binary is installed as a git subcommand and as a Mercurial
//! extension. The Mercurial wrapper passes a literal `--mercurial` token as
//! the first forwarded argument; everything else is the git personality.
//! The personality is a plain value threaded into `help`, `version` and
//! `update`.

use std::fmt;

/// Token the Mercurial wrapper passes first.
pub const MERCURIAL_FLAG: &str = "--mercurial";

/// Git-flavoured or Mercurial-flavoured presentation and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Personality {
    #[default]
    Git,
    Mercurial,
}

impl Personality {
    /// Detect the personality from forwarded arguments.
    ///
    /// # Example
    ///
    /// ```
    /// use skara::core::personality::Personality;
    ///
    /// let args = vec!["--mercurial".to_string()];
    /// assert_eq!(Personality::detect(&args), Personality::Mercurial);
    /// assert_eq!(Personality::detect(&[]), Personality::Git);
    /// ```
    pub fn detect(args: &[String]) -> Self {
        match args.first() {
            Some(first) if first == MERCURIAL_FLAG => Personality::Mercurial,
            _ => Personality::Git,
        }
    }

    /// Executable name of the VCS.
    pub fn vcs(self) -> &'static str {
        match self {
            Personality::Git => "git",
            Personality::Mercurial => "hg",
        }
    }

    /// Documentation link printed at the end of help.
    pub fn documentation_url(self) -> &'static str {
        match self {
            Personality::Git => "https://wiki.openjdk.java.net/display/skara",
            Personality::Mercurial => "https://wiki.openjdk.java.net/display/SKARA/Mercurial",
        }
    }

    /// Configuration key that points at the installation.
    pub fn installation_key(self) -> &'static str {
        match self {
            Personality::Git => "include.path",
            Personality::Mercurial => "extensions.skara",
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.vcs())
    }
}
