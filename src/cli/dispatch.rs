//! cli::dispatch
//!
//! Routes `git skara <name> [args...]` to a registered entry point.
//!
//! # Meta-commands
//!
//! `help`, `version` and `update` are always available and are not part of
//! the registry. Everything else is looked up by name; the remaining
//! arguments are forwarded untouched.
//!
//! # Personality
//!
//! When the first forwarded argument is `--mercurial` the tool was invoked
//! through the Mercurial extension. Help text, the version line and the
//! update lookup then use Mercurial vocabulary.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use thiserror::Error;

use crate::core::personality::Personality;
use crate::ui::output;

pub const HELP: &str = "help";
pub const VERSION: &str = "version";
pub const UPDATE: &str = "update";

/// Meta-commands, in the order Mercurial help lists them.
pub const META_COMMANDS: [&str; 3] = [HELP, VERSION, UPDATE];

/// Commands the Mercurial extension exposes.
pub const MERCURIAL_COMMANDS: [&str; 3] = ["defpath", "jcheck", "webrev"];

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown command: {name}")]
    UnknownCommand { name: String },
}

/// Something the dispatcher can run.
///
/// Returns the process exit code. An `Err` is reported as `error: <message>`
/// and exits 1.
pub trait EntryPoint: Send + Sync {
    fn run(&self, args: &[String]) -> anyhow::Result<i32>;
}

impl<F> EntryPoint for F
where
    F: Fn(&[String]) -> anyhow::Result<i32> + Send + Sync,
{
    fn run(&self, args: &[String]) -> anyhow::Result<i32> {
        self(args)
    }
}

/// Named entry points, iterated in name order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn EntryPoint>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `name`, replacing any previous registration.
    pub fn register(mut self, name: &'static str, entry: impl EntryPoint + 'static) -> Self {
        self.commands.insert(name, Box::new(entry));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn EntryPoint> {
        self.commands.get(name).map(|entry| entry.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Names advertised in help for `personality`.
fn advertised_names(personality: Personality, registry: &CommandRegistry) -> Vec<&'static str> {
    match personality {
        Personality::Git => registry
            .names()
            .chain(META_COMMANDS)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        Personality::Mercurial => MERCURIAL_COMMANDS
            .into_iter()
            .chain(META_COMMANDS)
            .collect(),
    }
}

/// The help listing.
pub fn render_help(personality: Personality, registry: &CommandRegistry) -> String {
    let vcs = personality.vcs();
    let names = advertised_names(personality, registry);

    let mut help = format!("usage: {} skara <{}>\n\n", vcs, names.join("|"));
    help.push_str(&format!("Additional available {} commands:\n", vcs));
    for name in names.iter().filter(|name| !META_COMMANDS.contains(name)) {
        help.push_str(&format!("- {} {}\n", vcs, name));
    }
    help.push_str("\nFor more information, please see the Skara wiki:\n\n");
    help.push_str(&format!("    {}\n\n", personality.documentation_url()));
    help
}

/// `<vcs> skara version: <version>`
pub fn version_line(personality: Personality) -> String {
    format!(
        "{} skara version: {}",
        personality.vcs(),
        option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
    )
}

/// Top-level command router.
pub struct Dispatcher {
    registry: CommandRegistry,
    update: Box<dyn EntryPoint>,
}

impl Dispatcher {
    /// Dispatcher over `registry`, running `update` for the update meta-command.
    pub fn new(registry: CommandRegistry, update: impl EntryPoint + 'static) -> Self {
        Self {
            registry,
            update: Box::new(update),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Look up a registered command.
    pub fn lookup(&self, name: &str) -> Result<&dyn EntryPoint, DispatchError> {
        self.registry
            .get(name)
            .ok_or_else(|| DispatchError::UnknownCommand {
                name: name.to_string(),
            })
    }

    /// Dispatch `argv` (without the program name) and return the exit code.
    pub fn dispatch(&self, argv: &[String]) -> i32 {
        self.dispatch_to(argv, &mut io::stdout(), &mut io::stderr())
    }

    /// [`Dispatcher::dispatch`] with explicit writers for the dispatcher's
    /// own output. Entry points write to the process streams.
    pub fn dispatch_to(&self, argv: &[String], out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        let (name, args) = match argv.split_first() {
            Some((name, args)) => (name.as_str(), args),
            None => (HELP, &[][..]),
        };
        let personality = Personality::detect(args);
        tracing::debug!(command = name, %personality, "dispatching");

        let result = match name {
            HELP => write!(out, "{}", render_help(personality, &self.registry))
                .map(|_| 0)
                .map_err(anyhow::Error::from),
            VERSION => writeln!(out, "{}", version_line(personality))
                .map(|_| 0)
                .map_err(anyhow::Error::from),
            UPDATE => self.update.run(args),
            _ => match self.lookup(name) {
                Ok(entry) => entry.run(args),
                Err(unknown) => {
                    // Personality comes from the whole argv here.
                    let help = render_help(Personality::detect(argv), &self.registry);
                    let _ = writeln!(err, "{}", output::format_error(&unknown));
                    let _ = write!(out, "{}", help);
                    return 1;
                }
            },
        };

        match result {
            Ok(code) => code,
            Err(error) => {
                tracing::debug!(command = name, ?error, "command failed");
                let _ = writeln!(err, "{}", output::format_error(format!("{:#}", error)));
                1
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// Registry whose entries record the arguments they receive.
    fn recording_registry(calls: &Arc<Mutex<Vec<(String, Vec<String>)>>>) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for name in ["jcheck", "webrev", "defpath", "pr", "jackpot"] {
            let calls = Arc::clone(calls);
            registry = registry.register(name, move |args: &[String]| -> anyhow::Result<i32> {
                calls.lock().unwrap().push((name.to_string(), args.to_vec()));
                Ok(0)
            });
        }
        registry
    }

    fn dispatcher() -> (Dispatcher, Arc<Mutex<Vec<(String, Vec<String>)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let update_calls = Arc::clone(&calls);
        let dispatcher = Dispatcher::new(recording_registry(&calls), move |args: &[String]| -> anyhow::Result<i32> {
            update_calls
                .lock()
                .unwrap()
                .push((UPDATE.to_string(), args.to_vec()));
            Ok(0)
        });
        (dispatcher, calls)
    }

    fn run(dispatcher: &Dispatcher, argv: &[&str]) -> (i32, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = dispatcher.dispatch_to(&args(argv), &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    mod routing {
        use super::*;

        #[test]
        fn forwards_remaining_arguments() {
            let (dispatcher, calls) = dispatcher();
            let (code, _, _) = run(&dispatcher, &["webrev", "-r", "HEAD~1", "--no-outgoing"]);

            assert_eq!(code, 0);
            assert_eq!(
                *calls.lock().unwrap(),
                vec![("webrev".to_string(), args(&["-r", "HEAD~1", "--no-outgoing"]))]
            );
        }

        #[test]
        fn empty_argv_is_help() {
            let (dispatcher, calls) = dispatcher();
            let (code, out, err) = run(&dispatcher, &[]);

            assert_eq!(code, 0);
            assert!(out.starts_with("usage: git skara <"));
            assert!(err.is_empty());
            assert!(calls.lock().unwrap().is_empty());
        }

        #[test]
        fn unknown_command_reports_and_fails() {
            let (dispatcher, calls) = dispatcher();
            let (code, out, err) = run(&dispatcher, &["bogus"]);

            assert_eq!(code, 1);
            assert_eq!(err, "error: unknown command: bogus\n");
            assert!(out.starts_with("usage: git skara <"));
            assert!(calls.lock().unwrap().is_empty());
        }

        #[test]
        fn update_goes_to_hook() {
            let (dispatcher, calls) = dispatcher();
            let (code, _, _) = run(&dispatcher, &["update", "--mercurial"]);

            assert_eq!(code, 0);
            assert_eq!(
                *calls.lock().unwrap(),
                vec![("update".to_string(), args(&["--mercurial"]))]
            );
        }

        #[test]
        fn entry_point_error_exits_one() {
            let registry = CommandRegistry::new().register("fail", |_: &[String]| -> anyhow::Result<i32> {
                Err(anyhow::anyhow!("could not resolve reference 'nope'"))
            });
            let dispatcher = Dispatcher::new(registry, |_: &[String]| -> anyhow::Result<i32> { Ok(0) });
            let (code, _, err) = run(&dispatcher, &["fail"]);

            assert_eq!(code, 1);
            assert_eq!(err, "error: could not resolve reference 'nope'\n");
        }

        #[test]
        fn entry_point_exit_code_is_returned() {
            let registry = CommandRegistry::new().register("three", |_: &[String]| -> anyhow::Result<i32> { Ok(3) });
            let dispatcher = Dispatcher::new(registry, |_: &[String]| -> anyhow::Result<i32> { Ok(0) });
            assert_eq!(run(&dispatcher, &["three"]).0, 3);
        }

        #[test]
        fn lookup_unknown() {
            let (dispatcher, _) = dispatcher();
            assert!(dispatcher.lookup("jcheck").is_ok());
            let err = dispatcher.lookup("nope").err().unwrap();
            assert_eq!(err.to_string(), "unknown command: nope");
        }
    }

    mod help {
        use super::*;

        #[test]
        fn git_lists_registered_and_meta_commands() {
            let (dispatcher, _) = dispatcher();
            let (_, out, _) = run(&dispatcher, &["help"]);

            assert_eq!(
                out,
                "usage: git skara <defpath|help|jackpot|jcheck|pr|update|version|webrev>\n\
                 \n\
                 Additional available git commands:\n\
                 - git defpath\n\
                 - git jackpot\n\
                 - git jcheck\n\
                 - git pr\n\
                 - git webrev\n\
                 \n\
                 For more information, please see the Skara wiki:\n\
                 \n\
                 \x20   https://wiki.openjdk.java.net/display/skara\n\
                 \n"
            );
        }

        #[test]
        fn mercurial_lists_only_mercurial_commands() {
            let (dispatcher, _) = dispatcher();
            let (code, out, _) = run(&dispatcher, &["help", "--mercurial"]);

            assert_eq!(code, 0);
            assert!(out.starts_with(
                "usage: hg skara <defpath|jcheck|webrev|help|version|update>\n"
            ));
            assert!(out.contains("Additional available hg commands:\n- hg defpath\n- hg jcheck\n- hg webrev\n\n"));
            assert!(!out.contains("jackpot"));
            assert!(out.contains("https://wiki.openjdk.java.net/display/SKARA/Mercurial"));
        }

        #[test]
        fn unknown_command_help_uses_original_argv() {
            let (dispatcher, _) = dispatcher();
            let (_, out, _) = run(&dispatcher, &["--mercurial", "bogus"]);

            assert!(out.starts_with("usage: hg skara <"));
        }

        #[test]
        fn help_is_deterministic() {
            let (dispatcher, _) = dispatcher();
            assert_eq!(run(&dispatcher, &["help"]).1, run(&dispatcher, &["help"]).1);
        }
    }

    mod version {
        use super::*;

        #[test]
        fn version_line_per_personality() {
            let (dispatcher, _) = dispatcher();

            let (code, out, _) = run(&dispatcher, &["version"]);
            assert_eq!(code, 0);
            assert_eq!(out, format!("git skara version: {}\n", env!("CARGO_PKG_VERSION")));

            let (_, out, _) = run(&dispatcher, &["version", "--mercurial"]);
            assert!(out.starts_with("hg skara version: "));
        }
    }
}
