//! Client error types.

use chatapp_core::NetError;

/// Errors that end a client session.
///
/// The user-facing lines for `NameTaken` and `ServerUnresponsive` are
/// printed by the session before the error is returned; callers only map
/// these to an exit code.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client listen port could not be bound. Fatal at startup.
    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        /// Requested port.
        port: u16,
        /// Underlying bind failure.
        source: std::io::Error,
    },

    /// The server rejected the startup registration: name already exists.
    #[error("name already registered")]
    NameTaken,

    /// A server exchange exhausted its retries; the client is exiting.
    #[error("server not responding")]
    ServerUnresponsive,

    /// Reliability-layer failure (encode or socket send).
    #[error(transparent)]
    Net(#[from] NetError),

    /// Terminal input failed.
    #[error("terminal input error: {0}")]
    Io(#[from] std::io::Error),
}
