//! Diagnostic logging setup
//!
//! Walker and controller records go to stdout through [`crate::output::text`].
//! Everything else (connection events, protocol diagnostics) is a `tracing`
//! event written to stderr, filtered by `RUST_LOG` when set.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `debug` raises the default level from `warn` to `debug`. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
