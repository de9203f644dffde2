//! Tracing subscriber setup shared by the polyquery binaries.
//!
//! Library code only emits `tracing` events; a binary calls [`init_tracing`] once
//! to decide where they go.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log filter '{}'", default_level)),
    }
}

/// Install a global fmt subscriber writing to stderr.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let filter = env_filter(default_level)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::debug!("Tracing initialized");
    Ok(())
}
