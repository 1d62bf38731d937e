//! The send capability over the room socket.
//!
//! An [`Outbox`] is a cheap, cloneable handle that queues outbound frames for
//! the connection loop. The store and the keep-alive task each hold one; nobody
//! else touches the socket.

use tokio::sync::mpsc;

use crate::error::{OttError, Result};
use crate::protocol::ClientMessage;

/// A frame queued for the connection loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A typed message, serialized by the loop.
    Message(ClientMessage),
    /// Raw text sent as-is.
    Raw(String),
}

/// Queue side of the outbound channel.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Outbox {
    /// Create an outbox and the receiver the connection loop drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a typed message.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::NotConnected`] once the connection loop has exited.
    pub fn send(&self, message: ClientMessage) -> Result<()> {
        self.push(Outbound::Message(message))
    }

    /// Queue raw text.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::NotConnected`] once the connection loop has exited.
    pub fn send_raw(&self, text: impl Into<String>) -> Result<()> {
        self.push(Outbound::Raw(text.into()))
    }

    /// Returns `true` once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn push(&self, frame: Outbound) -> Result<()> {
        self.tx.send(frame).map_err(|_| OttError::NotConnected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn frames_arrive_in_order() {
        let (outbox, mut rx) = Outbox::channel();
        outbox.send(ClientMessage::Ping).unwrap();
        outbox.send_raw("hello").unwrap();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Message(ClientMessage::Ping));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Raw("hello".into()));
    }

    #[test]
    fn send_fails_after_receiver_dropped() {
        let (outbox, rx) = Outbox::channel();
        drop(rx);
        assert!(outbox.is_closed());
        assert!(matches!(
            outbox.send(ClientMessage::Ping),
            Err(OttError::NotConnected)
        ));
    }
}
