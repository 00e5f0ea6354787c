//! Telemetry error types.

use thiserror::Error;

/// Errors raised while installing the log subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level, directive or format could not be parsed.
    #[error("Invalid log configuration: {0}")]
    Config(String),

    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    Init(String),

    /// The log directory could not be created.
    #[error("Log directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
