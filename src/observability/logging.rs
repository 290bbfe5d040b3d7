//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable via `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the configured level, scoped to this crate.
pub fn default_directive(level: &str) -> String {
    format!("socket_policy_server={}", level.to_ascii_lowercase())
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
