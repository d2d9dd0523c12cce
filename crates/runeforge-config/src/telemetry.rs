//! Tracing bootstrap for hosts embedding the rules engine.

use tracing_subscriber::EnvFilter;

/// Installs a JSON `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`. Returns `false` if a global subscriber already exists.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .json()
        .try_init()
        .is_ok()
}
