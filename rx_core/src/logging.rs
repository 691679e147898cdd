//! Logging setup for rxledger.
//!
//! Everything goes to stderr so `query` payloads on stdout stay byte-exact.
//! `RUST_LOG` always wins over the verbosity chosen on the command line.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count
///
/// 0 keeps ledger operations at INFO and dependencies at WARN; each extra
/// `-v` opens up one more level for this crate.
pub fn directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,rx_core=info",
        1 => "warn,rx_core=debug",
        _ => "info,rx_core=trace",
    }
}

/// Install the global subscriber
pub fn init(verbosity: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
