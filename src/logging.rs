//! Tracing setup for embedding applications
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! the host's job. `init` is a convenience that builds the usual registry
//! (env-filter + fmt layer) for hosts that do not have their own setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global tracing subscriber with the given default filter.
///
/// `RUST_LOG` takes precedence when set. Calling this when a subscriber is
/// already installed is a no-op.
pub fn init(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
