//! telemetry
//!
//! Diagnostic logging through `tracing`.
//!
//! Logs go to stderr so they never mix with command output. The filter is
//! read from `SKARA_LOG` using `EnvFilter` directive syntax
//! (`SKARA_LOG=debug`, `SKARA_LOG=skara::engine=trace`) and defaults to
//! `warn`.

use tracing::metadata::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SKARA_LOG";

fn filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy()
}

/// Install the global subscriber.
///
/// Does nothing if a subscriber is already installed.
pub fn init() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .finish();

    if subscriber.try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
