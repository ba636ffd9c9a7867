//! Logging initialization for processes embedding the client.
//!
//! The client itself only emits `tracing` events. Host programs that have no
//! subscriber of their own can install one here, with level filtering via the
//! `DASHBOARD_BUS_LOG` environment variable and a fallback to `info`.
//!
//! ```bash
//! # Show suppressed connection errors and connection reuse
//! DASHBOARD_BUS_LOG=dashboard_message_bus_client=debug my-tool
//! ```

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "DASHBOARD_BUS_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber, writing to stderr.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Like [`init`], but leaves an already installed subscriber alone.
///
/// Returns `true` if this call installed the subscriber.
pub fn try_init() -> bool {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
