//! Logging infrastructure for Vivarium.
//!
//! Centralized tracing setup shared by every binary: compact console
//! output with environment-based filtering. `RUST_LOG` overrides the
//! default level in both entry points.

use tracing_subscriber::EnvFilter;

/// Initialize logging at the default INFO level
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with a specific default level
/// (debug, info, warn, error)
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}
