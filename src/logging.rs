//! Diagnostic logging setup.
//!
//! Uses the `tracing` ecosystem. Diagnostics (tool command lines, warnings,
//! per-file errors) go to stderr so stdout carries only the progress report.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Install the global subscriber.
///
/// `verbose` selects DEBUG level, which includes every external command line.
/// `RUST_LOG` overrides the level when set. Calling this twice is harmless:
/// the second subscriber is ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
