//! Error types for the room client.

use thiserror::Error;

/// Errors that can occur when using the room client.
#[derive(Debug, Error)]
pub enum OttError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// An HTTP request to the room server's API failed.
    #[error("http error: {0}")]
    Http(String),

    /// Reading or writing the local key-value storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "http-reqwest")]
impl From<reqwest::Error> for OttError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// A specialized [`Result`] type for room client operations.
pub type Result<T> = std::result::Result<T, OttError>;
