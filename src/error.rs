//! Error types for cachebench operations.
//!
//! Two families of failure exist. Counter failures are instrumentation
//! problems and never stop a sweep; allocation and configuration failures
//! abort the current benchmark entry and reach the caller as values.

use std::io;

use thiserror::Error;

/// Errors raised by a hardware-counter session.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The counter backend could not be opened or an event could not be registered.
    #[error("Failed to register counter event `{event}`: {source}")]
    Register {
        /// Name of the event that failed to register.
        event: &'static str,
        #[source]
        source: io::Error,
    },
    /// Starting the event set failed.
    #[error("Failed to start counters: {0}")]
    Start(#[source] io::Error),
    /// Stopping or reading the event set failed.
    #[error("Failed to stop counters: {0}")]
    Stop(#[source] io::Error),
    /// Resetting the event set failed.
    #[error("Failed to reset counters: {0}")]
    Reset(#[source] io::Error),
    /// The session is running in degraded mode.
    #[error("Hardware counters are unavailable: {reason}")]
    Unavailable {
        /// Why the session could not be opened.
        reason: String,
    },
}

/// Errors that can occur while preparing or running a benchmark.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Matrix buffer allocation failed.
    #[error("Memory allocation failed: {message} (requested {requested_bytes} bytes for a {dimension}x{dimension} matrix)")]
    Allocation {
        /// Matrix dimension that was requested.
        dimension: usize,
        /// Number of bytes that were requested, saturated on overflow.
        requested_bytes: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Input validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },
    /// A counter failure that was surfaced instead of absorbed.
    #[error(transparent)]
    Counter(#[from] CounterError),
    /// The result sink could not be written.
    #[error("Failed to write result record: {0}")]
    Sink(#[from] io::Error),
    /// A record could not be serialized for a structured sink.
    #[error("Failed to serialize result record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for cachebench operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Creates an allocation error.
pub fn allocation_error(
    dimension: usize,
    requested_bytes: usize,
    message: impl Into<String>,
) -> BenchError {
    BenchError::Allocation {
        dimension,
        requested_bytes,
        message: message.into(),
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> BenchError {
    BenchError::Validation {
        message: message.into(),
    }
}

impl BenchError {
    /// Whether this error means a matrix buffer could not be obtained.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, BenchError::Allocation { .. })
    }
}
