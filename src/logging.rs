//! Tracing setup for the demo binary, grounded in the teacher's
//! `telemetry/tracing.rs` (env-filtered `tracing-subscriber` with a
//! compact formatter).

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global `tracing` subscriber. `default_level` is used when
/// `RUST_LOG` is unset.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_target(false).compact().init();
}
