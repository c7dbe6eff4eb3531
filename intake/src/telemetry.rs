//! Tracing initialization.
//!
//! Log filtering follows the standard `RUST_LOG` environment variable, e.g.
//! `RUST_LOG=intake=debug,tower_http=info`. Without it, everything at `info` and above is shown.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber: env filter plus console output.
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
