//! Relay error types

use thiserror::Error;

/// Failure to place a payload on a connection's outgoing queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// The queue is at capacity; the consumer is not keeping up
    #[error("outgoing queue is full")]
    Full,

    /// The queue was closed or its reader has gone away
    #[error("outgoing queue is closed")]
    Closed,
}

/// Relay error type
#[derive(Debug, Error)]
pub enum RelayError {
    /// The registry control loop is no longer accepting requests
    #[error("registry is not running")]
    RegistryClosed,
}

/// Relay result type
pub type RelayResult<T> = Result<T, RelayError>;
