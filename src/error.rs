//! Error handling for the barpoll metrics service.

use std::time::Duration;

/// A specialized `Result` type for barpoll service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Fatal errors: only initialization or channel wiring failures terminate
/// the process. Collector failures never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal channel closed unexpectedly
    #[error("Channel error: {0}")]
    Channel(String),
}

impl ServiceError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new channel error
    pub fn channel_error(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }
}

/// Per-collector failure taxonomy. These never crash the process; the
/// aggregator folds them into per-metric status.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Sensor momentarily unreadable; retried next tick.
    #[error("transient read failure: {0}")]
    Transient(String),

    /// Source produced text we could not interpret; retried next tick.
    #[error("parse error: {0}")]
    Parse(String),

    /// Capability absent on this machine (no battery, no sensor path).
    /// Retried only at the slow cadence.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A monotonic counter decreased; the interval yields no rate.
    #[error("counter reset detected")]
    CounterReset,

    /// Blocking collector exceeded its deadline; counted as transient.
    #[error("collector timed out after {0:?}")]
    Timeout(Duration),
}

impl CollectError {
    /// Create a new transient failure
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new permanent-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether this failure should switch the metric to the slow retry
    /// cadence instead of normal backoff.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<std::io::Error> for CollectError {
    fn from(err: std::io::Error) -> Self {
        Self::Transient(err.to_string())
    }
}
