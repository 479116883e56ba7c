//! Tracing subscriber setup.
//!
//! The library crates only emit `tracing` events; binaries and tests decide
//! where they go. `RUST_LOG` wins over the default filter passed in.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::EngineError;

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global `fmt` subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Like [`init_tracing`], but reports an already-installed subscriber as an
/// error instead of panicking. Safe to call from every test.
pub fn try_init_tracing(default_filter: &str) -> Result<(), EngineError> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}
