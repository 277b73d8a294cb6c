//! Diagnostic tracing for terrahoot.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: diagnostics via `RUST_LOG` or `TERRAHOOT_DEBUG`,
//!   output to stderr.
//!
//! - **Command output**: changed-file listings are printed to stdout and are
//!   unaffected by the log filter. Terragrunt writes straight to the inherited
//!   stdout/stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug { "terrahoot=debug" } else { "warn" }
}

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` first. Otherwise defaults to `warn`, or to debug output
/// for terrahoot when `debug` is set.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// TERRAHOOT_DEBUG=1 terrahoot plan
/// ```
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
