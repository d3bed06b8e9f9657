//! This module contains utilities that are only meant for testing purposes.
use tracing_subscriber::EnvFilter;

mod backend;
mod network;

pub use backend::*;
pub use network::*;

/// Installs a tracing subscriber writing to the test output. Verbosity is
/// controlled with `RUST_LOG`. Subsequent calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
