//! Logging for fitlog.
//!
//! The `fitlog` binary calls [`init_with_level`] with `"warn"`, so a normal run
//! only prints skipped WAL lines, quarantined snapshots and failed writes.
//! Store opens, compactions, config loads and exports log at `info`; run with
//! `RUST_LOG=fitlog_core=info` to watch them. Log lines go to stderr.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging at INFO, overridable with `RUST_LOG`.
///
/// For embedders that want store activity visible by default.
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with a specific default level
///
/// # Arguments
/// * `default_level` - Default log level (debug, info, warn, error)
///
/// `RUST_LOG` still wins when set.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Route `debug` and above into the test harness output (used by the store tests)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
