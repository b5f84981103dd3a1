//! `tracing`-based logging setup, shared by both binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes a process-wide subscriber honoring `RUST_LOG`, falling back
/// to `level` (one of spec §6's `--log_level` values: `error`, `warn`,
/// `info`, `debug`, `trace`) when the environment variable is unset.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(true).init();
}
