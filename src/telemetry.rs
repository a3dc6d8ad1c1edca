//! Structured logging bootstrap.
//!
//! The engine emits `tracing` events; hosts that do not install their own
//! subscriber can call [`init_tracing`] once at start-up.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Error returned when the global subscriber cannot be installed.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The directive string could not be parsed.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter {
        /// The rejected directive.
        directive: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Installs a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (for example `"taskmarket=info"`).
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the fallback directive is
/// malformed and [`TelemetryError::AlreadyInstalled`] when another
/// subscriber is active.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(default_directive)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}

fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|err| TelemetryError::InvalidFilter {
        directive: directive.to_owned(),
        message: err.to_string(),
    })
}
