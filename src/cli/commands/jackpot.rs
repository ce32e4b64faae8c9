//! jackpot command - Run the Jackpot analyzer over outgoing changes
//!
//! Resolves the base commit, diffs the working tree against it, writes the
//! patch to a temporary file and runs the build's `jackpot` make target
//! restricted to the modules the patch touches.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use anyhow::{Context as _, Result};
use tempfile::NamedTempFile;

use crate::cli::args::JackpotArgs;
use crate::cli::dispatch::EntryPoint;
use crate::core::types::ResolvedBase;
use crate::engine::outgoing::{OutgoingOptions, OutgoingResolver, ResolveError};
use crate::git::{Diff, Git, RevisionStore};
use crate::ui::output::{self, Verbosity};

/// Make target that runs the analyzer.
pub const MAKE_TARGET: &str = "jackpot";

const USE_REV_HINT: &str = "Use --rev to specify revision to compare against";

/// The `jackpot` entry point.
#[derive(Debug, Clone)]
pub struct Jackpot {
    jobs: usize,
}

impl Jackpot {
    pub fn new(jobs: usize) -> Self {
        Self { jobs }
    }
}

impl EntryPoint for Jackpot {
    fn run(&self, args: &[String]) -> Result<i32> {
        let args = match JackpotArgs::try_parse_args(args) {
            Ok(args) => args,
            Err(err) => {
                err.print()?;
                return Ok(err.exit_code());
            }
        };

        if args.version {
            println!(
                "git-jackpot version: {}",
                option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
            );
            return Ok(0);
        }

        let verbosity = Verbosity::from_quiet(args.quiet);
        if args.mercurial {
            output::warn("--mercurial is deprecated and has no effect", verbosity);
        }

        let cwd = std::env::current_dir().context("could not determine working directory")?;
        let git = Git::open(&cwd)?;

        let stdin = io::stdin();
        let prepared = match prepare(&git, &args, self.jobs, &mut stdin.lock())? {
            Some(prepared) => prepared,
            None => return Ok(1),
        };

        let status = make_command(git.root(), &prepared.modules, prepared.patch.path())
            .status()
            .context("could not run make")?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Everything needed to invoke make.
#[derive(Debug)]
pub struct Prepared {
    pub base: ResolvedBase,
    pub modules: Vec<String>,
    /// Removed when dropped
    pub patch: NamedTempFile,
}

/// Resolve the base, diff against it and write the patch file.
///
/// Returns `None` if the base could not be picked automatically; the error
/// and a hint have already been printed.
pub fn prepare(
    store: &dyn RevisionStore,
    args: &JackpotArgs,
    jobs: usize,
    stdin: &mut dyn BufRead,
) -> Result<Option<Prepared>> {
    let options = OutgoingOptions {
        rev: args.rev.clone(),
        remote: args.remote.clone(),
        no_outgoing: args.no_outgoing,
        jobs,
    };
    let base = match OutgoingResolver::new(store).resolve(&options) {
        Ok(base) => base,
        Err(err @ ResolveError::AmbiguousRemote { .. }) => {
            output::error_with_hint(&err, USE_REV_HINT);
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(base = %base.commit, provenance = %base.provenance, "resolved base");

    let files = match &args.file {
        Some(path) if path == Path::new("-") => parse_file_list(stdin)?,
        Some(path) => {
            let file = fs::File::open(path)
                .with_context(|| format!("could not read {}", path.display()))?;
            parse_file_list(&mut BufReader::new(file))?
        }
        None => Vec::new(),
    };

    let diff = store.diff(&base.commit, &files)?;
    let modules = modules(&diff);

    let patch = tempfile::Builder::new()
        .prefix("patch")
        .suffix(".patch")
        .tempfile()
        .context("could not create patch file")?;
    diff.write_to(patch.path())
        .with_context(|| format!("could not write {}", patch.path().display()))?;

    Ok(Some(Prepared {
        base,
        modules,
        patch,
    }))
}

/// One path per line; blank lines are ignored.
pub fn parse_file_list(reader: &mut dyn BufRead) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            paths.push(PathBuf::from(line));
        }
    }
    Ok(paths)
}

/// Modules touched by the diff: the directory under `src/` of every changed
/// source path, in patch order without repeats.
pub fn modules(diff: &Diff) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();
    for path in diff.patches.iter().filter_map(|p| p.source.as_deref()) {
        let mut components = path.components().filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        });
        if components.next().map_or(true, |first| first != "src") {
            continue;
        }
        let Some(module) = components.next() else {
            continue;
        };
        let module = module.to_string_lossy().into_owned();
        if !modules.contains(&module) {
            modules.push(module);
        }
    }
    modules
}

/// `make JACKPOT_MODULES=.. "JACKPOT_EXTRA_OPTIONS=--filter-patch .." jackpot`
/// in `root`.
pub fn make_command(root: &Path, modules: &[String], patch: &Path) -> Command {
    let mut cmd = Command::new("make");
    cmd.arg(format!("JACKPOT_MODULES={}", modules.join(" ")))
        .arg(format!(
            "JACKPOT_EXTRA_OPTIONS=--filter-patch {}",
            patch.display()
        ))
        .arg(MAKE_TARGET)
        .current_dir(root);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Provenance;
    use crate::git::mock::{MockOperation, MockStore};
    use crate::git::FilePatch;
    use std::ffi::OsStr;
    use std::io::Cursor;

    fn patch(source: Option<&str>, target: Option<&str>) -> FilePatch {
        FilePatch {
            source: source.map(PathBuf::from),
            target: target.map(PathBuf::from),
        }
    }

    fn args(values: &[&str]) -> JackpotArgs {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        JackpotArgs::try_parse_args(&values).unwrap()
    }

    mod modules {
        use super::*;

        #[test]
        fn second_component_under_src() {
            let diff = Diff {
                patches: vec![
                    patch(
                        Some("src/java.base/share/classes/java/lang/String.java"),
                        Some("src/java.base/share/classes/java/lang/String.java"),
                    ),
                    patch(Some("src/jdk.compiler/share/Foo.java"), None),
                    patch(Some("src/java.base/share/Bar.java"), Some("src/java.base/share/Bar.java")),
                ],
                text: String::new(),
            };
            assert_eq!(modules(&diff), vec!["java.base", "jdk.compiler"]);
        }

        #[test]
        fn other_paths_ignored() {
            let diff = Diff {
                patches: vec![
                    patch(Some("test/jdk/Foo.java"), Some("test/jdk/Foo.java")),
                    patch(Some("src"), Some("src")),
                    patch(Some("make/src/Build.gmk"), Some("make/src/Build.gmk")),
                    patch(None, Some("src/java.desktop/New.java")),
                ],
                text: String::new(),
            };
            assert!(modules(&diff).is_empty());
        }
    }

    mod file_list {
        use super::*;

        #[test]
        fn one_path_per_line() {
            let mut input = Cursor::new("src/a/A.java\n\n  src/b/B.java  \n");
            assert_eq!(
                parse_file_list(&mut input).unwrap(),
                vec![PathBuf::from("src/a/A.java"), PathBuf::from("src/b/B.java")]
            );
        }
    }

    mod make {
        use super::*;

        #[test]
        fn invocation() {
            let cmd = make_command(
                Path::new("/work/jdk"),
                &["java.base".to_string(), "jdk.compiler".to_string()],
                Path::new("/tmp/patch123.patch"),
            );

            assert_eq!(cmd.get_program(), OsStr::new("make"));
            let args: Vec<_> = cmd.get_args().collect();
            assert_eq!(
                args,
                vec![
                    OsStr::new("JACKPOT_MODULES=java.base jdk.compiler"),
                    OsStr::new("JACKPOT_EXTRA_OPTIONS=--filter-patch /tmp/patch123.patch"),
                    OsStr::new("jackpot"),
                ]
            );
            assert_eq!(cmd.get_current_dir(), Some(Path::new("/work/jdk")));
        }
    }

    mod prepare {
        use super::*;

        fn store() -> MockStore {
            let store = MockStore::new();
            let root = store.commit(&[]);
            let head = store.chain(&root, 2);
            store.set_head(&head);
            store.set_ref("base", &root);
            store.add_remote("origin", "https://git.example.org/jdk.git");
            store.add_remote_branch("origin", "master", &root);
            store.set_diff(Diff {
                patches: vec![patch(
                    Some("src/java.base/Foo.java"),
                    Some("src/java.base/Foo.java"),
                )],
                text: "--- a/src/java.base/Foo.java\n+++ b/src/java.base/Foo.java\n".to_string(),
            });
            store
        }

        #[test]
        fn explicit_rev_and_stdin_files() {
            let store = store();
            let mut stdin = Cursor::new("src/java.base/Foo.java\n");

            let prepared = prepare(&store, &args(&["-r", "base", "-"]), 1, &mut stdin)
                .unwrap()
                .unwrap();

            assert_eq!(prepared.base.provenance, Provenance::Explicit("base".into()));
            assert_eq!(prepared.modules, vec!["java.base"]);
            assert_eq!(
                fs::read_to_string(prepared.patch.path()).unwrap(),
                "--- a/src/java.base/Foo.java\n+++ b/src/java.base/Foo.java\n"
            );
            assert!(store.operations().contains(&MockOperation::Diff {
                base: prepared.base.commit.clone(),
                paths: vec![PathBuf::from("src/java.base/Foo.java")],
            }));
        }

        #[test]
        fn outgoing_search_by_default() {
            let store = store();
            let prepared = prepare(&store, &args(&[]), 2, &mut Cursor::new(""))
                .unwrap()
                .unwrap();
            assert!(matches!(prepared.base.provenance, Provenance::MergeBase { .. }));
            assert_eq!(store.fetch_count(), 1);
        }

        #[test]
        fn ambiguous_remote_stops_quietly() {
            let store = MockStore::new();
            let root = store.commit(&[]);
            store.set_head(&root);

            let prepared = prepare(&store, &args(&[]), 1, &mut Cursor::new("")).unwrap();
            assert!(prepared.is_none());
        }

        #[test]
        fn unresolvable_rev_is_error() {
            let store = store();
            let err = prepare(&store, &args(&["--rev", "missing"]), 1, &mut Cursor::new(""))
                .unwrap_err();
            assert_eq!(err.to_string(), "could not resolve reference 'missing'");
        }

        #[test]
        fn file_list_from_file() {
            let store = store();
            let temp = tempfile::TempDir::new().unwrap();
            let list = temp.path().join("files.txt");
            fs::write(&list, "src/java.base/Foo.java\n").unwrap();

            prepare(
                &store,
                &args(&["-N", list.to_str().unwrap()]),
                1,
                &mut Cursor::new(""),
            )
            .unwrap()
            .unwrap();

            assert!(store.operations().iter().any(|op| matches!(
                op,
                MockOperation::Diff { paths, .. } if paths == &vec![PathBuf::from("src/java.base/Foo.java")]
            )));
        }
    }
}
