//! Logging initialization for streamtap-daemon.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `StreamtapConfig`. `RUST_LOG`, when set, replaces the configured level.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use streamtap_core::config::GeneralConfig;

/// Build the level filter: `RUST_LOG` first, then the configured level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Build the output layer for the configured format.
fn format_layer(format: &str) -> Result<Box<dyn Layer<Registry> + Send + Sync>> {
    match format {
        "json" => Ok(tracing_subscriber::fmt::layer().json().boxed()),
        "pretty" => Ok(tracing_subscriber::fmt::layer().pretty().boxed()),
        other => Err(anyhow::anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        )),
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines
/// * `"pretty"` - Human-readable output (default)
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let layer = format_layer(&config.log_format)?;

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter(&config.log_level))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
