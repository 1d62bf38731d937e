//! Notifications emitted by the room client.
//!
//! Two channels leave the client:
//!
//! - a bounded [`mpsc`] channel of [`RoomClientEvent`]s, for things a view
//!   reacts to once (start playback, show a toast, ...);
//! - a [`watch`] channel carrying a revision counter that is bumped after every
//!   state mutation, for views that re-render from a snapshot.

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::event_queue::RoomEvent;

/// Events emitted by the room client.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomClientEvent {
    /// The socket opened (initially or after a reconnect).
    Connected,
    /// The room could not be joined; the client will not reconnect.
    RoomJoinFailure { reason: String },
    /// A sync flipped the room from paused to playing.
    PlayVideo,
    /// A sync flipped the room from playing to paused.
    PauseVideo,
    /// A sync was merged into the room snapshot.
    Sync,
    /// A room event was queued (or coalesced into the previous one).
    RoomEvent(RoomEvent),
    /// The server broadcast an announcement.
    Announcement { text: String },
    /// The server reported an application error.
    Error { message: String },
    /// The connection loop exited. Always the last event.
    Disconnected { reason: Option<String> },
}

/// Sending side of both notification channels.
#[derive(Debug, Clone)]
pub struct EventSink {
    events: mpsc::Sender<RoomClientEvent>,
    revision: watch::Sender<u64>,
}

impl EventSink {
    /// Create a sink with an event channel of the given capacity.
    ///
    /// Capacity is clamped to at least 1.
    pub fn channel(
        capacity: usize,
    ) -> (
        Self,
        mpsc::Receiver<RoomClientEvent>,
        watch::Receiver<u64>,
    ) {
        let (events, events_rx) = mpsc::channel(capacity.max(1));
        let (revision, revision_rx) = watch::channel(0);
        (Self { events, revision }, events_rx, revision_rx)
    }

    /// Emit an event. If the channel is full, log a warning and drop the event
    /// rather than block the caller.
    pub fn emit(&self, event: RoomClientEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    "event channel full, dropping event: {:?}",
                    std::mem::discriminant(&dropped)
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
    }

    /// Emit an event that must not be dropped, waiting for channel space.
    pub async fn emit_reliable(&self, event: RoomClientEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event channel closed, receiver dropped");
        }
    }

    /// Signal that the store changed.
    pub fn changed(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Subscribe to the revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (sink, mut rx, _rev) = EventSink::channel(1);
        sink.emit(RoomClientEvent::PlayVideo);
        sink.emit(RoomClientEvent::PauseVideo);

        assert_eq!(rx.try_recv().unwrap(), RoomClientEvent::PlayVideo);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn changed_bumps_revision() {
        let (sink, _rx, rev) = EventSink::channel(4);
        assert_eq!(*rev.borrow(), 0);
        sink.changed();
        sink.changed();
        assert_eq!(*rev.borrow(), 2);
        assert_eq!(*sink.subscribe().borrow(), 2);
    }
}
