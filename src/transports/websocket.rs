//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! This module provides [`WebSocketTransport`], a [`Transport`] implementation
//! that talks to the room server over a WebSocket, and [`WebSocketConnector`],
//! which opens a new one for every (re)connection attempt. Both `ws://` and
//! `wss://` URLs are accepted.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), ott_client::OttError> {
//! use ott_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:8080/api/room/test").await?;
//! transport.send(r#"{"action":"ping"}"#.to_string()).await?;
//!
//! if let Some(Ok(msg)) = transport.recv().await {
//!     println!("received: {msg}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::OttError;
use crate::protocol::CloseInfo;
use crate::transport::{Connector, Transport};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any messages.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
    close_info: Option<CloseInfo>,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::Io`] if the URL is invalid or the connection
    /// cannot be established. When the underlying error is an I/O error its
    /// [`ErrorKind`](std::io::ErrorKind) is preserved.
    pub async fn connect(url: &str) -> Result<Self, OttError> {
        tracing::debug!(url = %url, "connecting to room socket");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            OttError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "room socket connected");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
            close_info: None,
        }
    }

    /// Like [`connect`](Self::connect), but fails with [`OttError::Timeout`]
    /// if the connection is not established within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::Timeout`] if the deadline elapses, or any error
    /// that [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, OttError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| OttError::Timeout)?
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), OttError> {
        if self.closed {
            return Err(OttError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| OttError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, OttError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(OttError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received close frame");
                    self.close_info = frame.map(|frame| CloseInfo {
                        code: u16::from(frame.code),
                        reason: frame.reason.to_string(),
                    });
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // tungstenite answers pings itself.
                }
                Message::Binary(_) => {
                    tracing::warn!("unexpected binary frame on room socket, skipping");
                }
                Message::Frame(_) => {}
            }
        }
    }

    fn close_info(&self) -> Option<CloseInfo> {
        self.close_info.clone()
    }

    async fn close(&mut self) -> Result<(), OttError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| OttError::TransportSend(e.to_string()))
    }
}

/// A [`Connector`] that dials a fixed WebSocket URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Create a connector for the given room socket URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: None,
        }
    }

    /// Give up on a connection attempt after `timeout`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// The URL this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self) -> Result<WebSocketTransport, OttError> {
        match self.connect_timeout {
            Some(timeout) => WebSocketTransport::connect_with_timeout(&self.url, timeout).await,
            None => WebSocketTransport::connect(&self.url).await,
        }
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, OttError::Io(_)));
    }

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn recv_receives_text_and_skips_binary() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"action":"chat"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"action":"chat"}"#);
    }

    #[tokio::test]
    async fn close_frame_code_is_recorded() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(Some(CloseFrame {
                code: CloseCode::from(4002),
                reason: "room not found".into(),
            }))
            .await
            .unwrap();
        })
        .await;

        let mut transport = WebSocketConnector::new(url).connect().await.unwrap();
        assert!(transport.recv().await.is_none());

        let close = transport.close_info().unwrap();
        assert_eq!(close.code, 4002);
        assert_eq!(close.reason, "room not found");
        assert!(close.is_room_not_found());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, OttError::TransportClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn connector_times_out_when_handshake_stalls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // Accept the TCP connection but never answer the upgrade request.
            let (_tcp, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let connector = WebSocketConnector::new(format!("ws://{addr}"))
            .with_connect_timeout(Duration::from_millis(50));
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, OttError::Timeout), "got {err:?}");

        server.abort();
    }
}
