//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Emits JSON lines with timestamps; filtering is controlled by `RUST_LOG`
/// (defaults to `info`). Safe to call multiple times (subsequent calls are
/// no-ops), which keeps test binaries that share the process happy.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}
