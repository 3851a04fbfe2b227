//! Tracing initialisation shared by Kaypoh binaries

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Reads `RUST_LOG`, then `KAYPOH_LOG_LEVEL`, falling back to `default_level`.
/// Calling this twice is harmless; the second install is ignored.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("KAYPOH_LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
