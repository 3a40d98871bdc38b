//! Protocol error types.

/// Errors from frame encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Encoded frame exceeds the UDP datagram ceiling.
    #[error("datagram too large: {size} bytes exceeds {max}")]
    DatagramTooLarge {
        /// Actual encoded size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    Encode(String),

    /// Inbound bytes are not a valid frame. The listener drops these.
    #[error("CBOR decode error: {0}")]
    Decode(String),
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
