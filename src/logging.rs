//! Logging initialization.
//!
//! Logs go to stderr so stdout carries only line protocol output. The level
//! comes from `RUST_LOG` when set, otherwise `info` (or `debug` with
//! `--verbose`).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Build the log filter for the given verbosity.
///
/// # Errors
/// Returns an error if `RUST_LOG` is set but cannot be parsed.
pub fn env_filter(verbose: bool) -> Result<EnvFilter, ParseError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives),
        _ => {
            let level = if verbose { "debug" } else { "info" };
            EnvFilter::try_new(format!("{}={level}", env!("CARGO_CRATE_NAME")))
        }
    }
}

/// Install the global subscriber.
pub fn init(verbose: bool) -> Result<(), ParseError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}
