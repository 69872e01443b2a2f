//! Shared logging setup for processes embedding the multiplexer.
//!
//! `RUST_LOG` always wins over the verbosity-derived default, so operators can
//! turn on `sqlwarden_core=debug` (which logs query text) without a rebuild.

use crate::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Maps CLI-style verbosity flags to a tracing level.
///
/// `quiet` wins over any verbosity; 0 = INFO, 1 = DEBUG, 2+ = TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

fn env_filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level_for(verbose, quiet)).into())
        .from_env_lossy()
}

/// Initializes human-readable structured logging.
///
/// # Example
/// ```rust,no_run
/// use sqlwarden_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::SqlWardenError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })
}

/// Initializes JSON-lines logging for hosts that ship logs to a collector.
///
/// # Errors
/// Returns a configuration error if a global subscriber is already set.
pub fn init_json_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(verbose, quiet))
        .with_current_span(true)
        .try_init()
        .map_err(|e| {
            crate::error::SqlWardenError::configuration(format!(
                "Failed to initialize JSON logging: {}",
                e
            ))
        })
}
