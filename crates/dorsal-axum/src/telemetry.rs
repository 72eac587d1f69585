//! Console logging for the service.
//!
//! Logs go through `tracing` and are printed by a `tracing_subscriber::fmt`
//! layer. The level is taken from `RUST_LOG` (for example
//! `RUST_LOG=dorsal=debug,info`) and defaults to `info`. With
//! `dorsal=debug`, every allocation span shows its retries and the
//! resolution of ambiguous writes.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber was already installed.
pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        )
        .try_init()?;
    Ok(())
}
