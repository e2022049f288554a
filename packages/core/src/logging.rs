//! Logging Setup
//!
//! The crate logs through `tracing` macros; embedders decide where the events
//! go. `init_tracing` is the default setup: formatted output filtered by
//! `RUST_LOG`, falling back to `info`.

/// Install a global `fmt` subscriber
///
/// Returns false when a global subscriber was already installed (tests
/// calling this more than once, or an embedder with its own setup).
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok()
}
