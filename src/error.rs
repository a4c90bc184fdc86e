//! Driveshaft error types.
//!
//! Error taxonomy for every socket, poll, actor, and device operation.
//!
//! Three families matter to callers:
//! - *Transient* (`WouldBlock`, `Interrupted`): the operation can be retried.
//!   Internal loops retry these; they only surface when the caller asked for
//!   a non-blocking operation.
//! - *Shutdown* (`Terminated`): the messaging context is tearing down. Always
//!   propagated upward and treated as "stop, not fail".
//! - *Fatal* (everything else): raised to the caller of the operation that
//!   detected it.

use thiserror::Error;

use crate::endpoint::EndpointError;

/// Main error type for driveshaft operations
#[derive(Error, Debug)]
pub enum DriveshaftError {
    /// Non-blocking operation found the socket not ready
    #[error("operation would block")]
    WouldBlock,

    /// Operation was interrupted and may be retried
    #[error("operation interrupted")]
    Interrupted,

    /// The owning context has been terminated
    #[error("messaging context terminated")]
    Terminated,

    /// Endpoint is already bound in this context
    #[error("endpoint already in use: {0}")]
    AddrInUse(String),

    /// Connect target was never bound in this context
    #[error("endpoint not found: {0}")]
    AddrNotFound(String),

    /// Endpoint string failed to parse
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A socket setup was configured without any bind or connect address
    #[error("no bind or connect endpoint configured")]
    NoEndpoint,

    /// Operation is not valid in the object's current state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Operation is not supported by this socket kind or device variant
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The peer side of a channel went away
    #[error("peer disconnected")]
    Disconnected,

    /// Invalid argument supplied by the caller
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error (thread spawning and similar OS-level failures)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for driveshaft operations
pub type Result<T> = std::result::Result<T, DriveshaftError>;

impl DriveshaftError {
    /// Create an invalid-argument error with a message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Check if this error is transient and the operation may be retried
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::WouldBlock | Self::Interrupted)
    }

    /// Check if this error signals context shutdown rather than a failure
    #[must_use]
    pub const fn is_termination(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DriveshaftError::WouldBlock.is_transient());
        assert!(DriveshaftError::Interrupted.is_transient());
        assert!(!DriveshaftError::Terminated.is_transient());
        assert!(!DriveshaftError::NoEndpoint.is_transient());
    }

    #[test]
    fn test_termination_classification() {
        assert!(DriveshaftError::Terminated.is_termination());
        assert!(!DriveshaftError::WouldBlock.is_termination());
        assert!(!DriveshaftError::Disconnected.is_termination());
    }
}
