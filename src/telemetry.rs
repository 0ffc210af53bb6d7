//! Tracing subscriber installation.
//!
//! The library only emits `tracing` events; hosts call [`init_tracing`] once
//! at start-up to render them.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Directive used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "gigflow=info";

/// Installs a global formatting subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. Returns `false` when
/// a global subscriber was already installed, which is harmless in tests.
#[must_use]
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
