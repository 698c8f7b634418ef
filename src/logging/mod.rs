// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Build the event filter, preferring `RUST_LOG` over the configured level
pub fn build_filter(level: &str) -> Result<EnvFilter, Box<dyn Error + Send + Sync>> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(level)?),
    }
}

/// Initialize the tracing subscriber for structured logging
///
/// Events go to stdout, either as one JSON object per line for log
/// aggregation or in the human-readable format for local runs.
///
/// # Errors
///
/// Returns an error if the level directive does not parse or a global
/// subscriber is already installed.
///
/// # Examples
///
/// ```
/// use kasasagi::config::LoggingConfig;
/// use kasasagi::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = build_filter(&config.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
}
