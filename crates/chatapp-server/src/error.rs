//! Server error types.

use chatapp_core::NetError;

/// Errors that can occur in the server runtime.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The UDP port could not be bound. Fatal at startup.
    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying bind failure.
        source: std::io::Error,
    },

    /// The bound socket's address could not be read.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Reliability-layer failure (encode or socket send).
    #[error(transparent)]
    Net(#[from] NetError),
}
