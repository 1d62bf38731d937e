//! Transport abstraction for the room socket.
//!
//! The [`Transport`] trait defines a bidirectional text message channel between
//! the client and the room server. The protocol uses JSON text messages, so
//! every transport implementation must handle message framing internally.
//!
//! # Connection Setup
//!
//! The room client reconnects on its own after a non-fatal close, so it does
//! not take a single connected transport. Instead it takes a [`Connector`]
//! that can open a fresh [`Transport`] on every attempt.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use ott_client::error::OttError;
//! use ott_client::protocol::CloseInfo;
//! use ott_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), OttError> {
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, OttError>> {
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     fn close_info(&self) -> Option<CloseInfo> {
//!         None
//!     }
//!
//!     async fn close(&mut self) -> Result<(), OttError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::OttError;
use crate::protocol::CloseInfo;

/// A bidirectional text message transport for the room socket.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON message.
/// Each call to [`recv`](Transport::recv) returns one complete JSON message.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), OttError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed by the server; see
    ///   [`close_info`](Transport::close_info) for the close code
    async fn recv(&mut self) -> Option<Result<String, OttError>>;

    /// The close code and reason sent by the server, once
    /// [`recv`](Transport::recv) has returned `None`.
    ///
    /// Returns `None` if the connection ended without a close frame.
    fn close_info(&self) -> Option<CloseInfo>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), OttError>;
}

/// Opens new [`Transport`]s to the room server.
///
/// Called once on start and again for every reconnection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by this connector.
    type Transport: Transport;

    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established; the client
    /// treats this as a failed (re)connection attempt.
    async fn connect(&self) -> Result<Self::Transport, OttError>;
}
