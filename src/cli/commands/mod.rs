//! cli::commands
//!
//! The registered subcommands.
//!
//! `jackpot` runs in-process; the rest of the suite is delegated to
//! `git-<name>` executables (see [`external`]). The `update` meta-command is
//! wired to [`crate::engine::update`].

mod external;
mod jackpot;

pub use external::{External, EXTERNAL_COMMANDS};
pub use jackpot::{make_command, modules, parse_file_list, prepare, Jackpot, Prepared, MAKE_TARGET};

use crate::cli::dispatch::{CommandRegistry, Dispatcher, EntryPoint};
use crate::core::config::Config;
use crate::core::personality::Personality;
use crate::engine::update::{SystemHost, UpdateOrchestrator};

/// Every subcommand, keyed by name.
pub fn registry(config: &Config) -> CommandRegistry {
    EXTERNAL_COMMANDS.into_iter().fold(
        CommandRegistry::new().register("jackpot", Jackpot::new(config.outgoing_jobs())),
        |registry, name| registry.register(name, External::new(name)),
    )
}

/// The `update` meta-command.
pub fn update(config: &Config) -> impl EntryPoint {
    let host = SystemHost::from_config(config);
    move |args: &[String]| -> anyhow::Result<i32> {
        UpdateOrchestrator::new(Personality::detect(args), &host).run()?;
        Ok(0)
    }
}

/// Dispatcher with every subcommand registered.
pub fn dispatcher(config: &Config) -> Dispatcher {
    Dispatcher::new(registry(config), update(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_whole_suite() {
        let registry = registry(&Config::default());
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "defpath",
                "fork",
                "info",
                "jackpot",
                "jcheck",
                "openjdk-import",
                "pr",
                "publish",
                "sync",
                "token",
                "translate",
                "verify-import",
                "webrev",
            ]
        );
    }

    #[test]
    fn meta_commands_not_in_registry() {
        let registry = registry(&Config::default());
        for meta in crate::cli::dispatch::META_COMMANDS {
            assert!(!registry.contains(meta));
        }
    }
}
