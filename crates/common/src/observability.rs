//! Tracing subscriber initialization.

use crate::config::ObservabilityConfig;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Errors from subscriber setup.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// The filter directive could not be parsed.
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    /// A global subscriber is already installed.
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns `ObservabilityError::InvalidFilter` for an unparsable directive and
/// `ObservabilityError::AlreadyInitialized` if called twice in one process.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|_| ObservabilityError::InvalidFilter(config.log_level.clone()))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|_| ObservabilityError::AlreadyInitialized)
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|_| ObservabilityError::AlreadyInitialized)
    }
}
