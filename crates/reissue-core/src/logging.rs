//! Logging bootstrap
//!
//! Library code only emits `tracing` events. Hosts that have no subscriber of
//! their own can call [`init_tracing`] once at startup.

use crate::types::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the filter for a logging configuration.
///
/// An unparsable directive falls back to `info` rather than silencing logs.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter(config))
        .try_init()
        .is_ok()
}
