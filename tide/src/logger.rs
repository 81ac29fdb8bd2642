//! Log output for the host.
//!
//! The engine logs through the `log` facade; those records are bridged into
//! `tracing` so both end up in the same formatted stream.

use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// A global subscriber was already set.
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
    /// A `log` logger was already set.
    #[error("failed to bridge log records: {0}")]
    Bridge(#[from] log::SetLoggerError),
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init() -> Result<(), LoggerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}
