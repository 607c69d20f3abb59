//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize a `tracing` subscriber.
///
/// Honours `RUST_LOG`; falls back to `default_level` when it is unset or
/// invalid. With `json_logs` the fmt layer emits one JSON object per event.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed or the filter
/// directive is invalid.
pub fn init_tracing(default_level: &str, json_logs: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let fmt_layer = if json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
