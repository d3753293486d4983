//! Tracing initialization.
//!
//! Sets up tracing-subscriber from the loaded config: console output for
//! dev, JSON for log collectors. `RUST_LOG` overrides the configured level
//! when set.

use crate::config::{Config, LogOutput};
use crate::error::{Error, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Initialize the global tracing subscriber.
///
/// Must be called once, before anything logs. An invalid configured level
/// falls back to "info" with a warning once the subscriber is up.
///
/// # Errors
///
/// Returns an error if a subscriber was already installed.
pub fn init_telemetry(config: &Config) -> Result<()> {
    let (env_filter, level_ok) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => match EnvFilter::try_new(&config.log_level) {
            Ok(filter) => (filter, true),
            Err(_) => (EnvFilter::new("info"), false),
        },
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_output {
        LogOutput::Console => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        LogOutput::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
    .map_err(|e| Error::Telemetry(format!("failed to init tracing subscriber: {e}")))?;

    if !level_ok {
        warn!(
            level = %config.log_level,
            "not a valid log level, defaulting to info"
        );
    }

    info!(
        application = %config.app_name,
        environment = %config.env_name,
        "telemetry initialized"
    );

    Ok(())
}
