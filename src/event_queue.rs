//! Transient room events shown to the user for a few seconds.
//!
//! Each incoming event is classified (undoable or not), given a display
//! timeout, and either appended to the queue or coalesced into the previous
//! entry when two seeks arrive back to back. Hiding expired events is the view
//! layer's job; it reports them back through [`EventQueue::dismiss`].

use std::time::Duration;

use serde::Serialize;

use crate::protocol::{EventParameters, RoomEventType, ServerEvent};

/// How long an undoable event stays on screen.
pub const UNDOABLE_EVENT_TIMEOUT: Duration = Duration::from_millis(7000);

/// How long any other event stays on screen.
pub const EVENT_TIMEOUT: Duration = Duration::from_millis(4000);

/// Amount a coalesced seek extends the visible seek's timeout by.
pub const SEEK_COALESCE_EXTENSION: Duration = Duration::from_millis(1);

/// A room event as held by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    pub event_type: RoomEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub parameters: EventParameters,
    pub is_visible: bool,
    pub is_undoable: bool,
    #[serde(serialize_with = "serialize_millis")]
    pub timeout: Duration,
}

impl RoomEvent {
    /// Build a visible event record from its wire form.
    pub fn from_server(event: ServerEvent) -> Self {
        let is_undoable = is_undoable(&event.event_type, &event.parameters);
        Self {
            event_type: event.event_type,
            user_name: event.user_name,
            parameters: event.parameters,
            is_visible: true,
            is_undoable,
            timeout: if is_undoable {
                UNDOABLE_EVENT_TIMEOUT
            } else {
                EVENT_TIMEOUT
            },
        }
    }
}

/// Seeks, skips and removals can be undone; so can adding a single video.
fn is_undoable(kind: &RoomEventType, parameters: &EventParameters) -> bool {
    match kind {
        RoomEventType::Seek | RoomEventType::Skip | RoomEventType::RemoveFromQueue => true,
        RoomEventType::AddToQueue => parameters.video.is_some(),
        _ => false,
    }
}

fn serialize_millis<S: serde::Serializer>(
    timeout: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
}

/// What [`EventQueue::push`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Appended,
    Coalesced,
}

/// Ordered log of room events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQueue {
    events: Vec<RoomEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event`, coalescing it into the last entry if both are seeks and
    /// the last one is still visible.
    pub fn push(&mut self, event: RoomEvent) -> Enqueued {
        if event.event_type == RoomEventType::Seek {
            if let Some(last) = self
                .events
                .last_mut()
                .filter(|last| last.event_type == RoomEventType::Seek && last.is_visible)
            {
                last.parameters.position = event.parameters.position;
                last.timeout += SEEK_COALESCE_EXTENSION;
                return Enqueued::Coalesced;
            }
        }
        self.events.push(event);
        Enqueued::Appended
    }

    /// Mark the event at `index` hidden. Returns `false` if there is none.
    pub fn dismiss(&mut self, index: usize) -> bool {
        match self.events.get_mut(index) {
            Some(event) => {
                event.is_visible = false;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn as_slice(&self) -> &[RoomEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::Video;

    fn server_event(kind: RoomEventType, parameters: EventParameters) -> ServerEvent {
        ServerEvent {
            event_type: kind,
            user_name: Some("alice".into()),
            parameters,
        }
    }

    fn seek(position: f64) -> RoomEvent {
        RoomEvent::from_server(server_event(
            RoomEventType::Seek,
            EventParameters {
                position: Some(position),
                ..Default::default()
            },
        ))
    }

    #[test]
    fn classification_and_timeouts() {
        let cases = [
            (RoomEventType::Seek, false, true),
            (RoomEventType::Skip, false, true),
            (RoomEventType::RemoveFromQueue, false, true),
            (RoomEventType::AddToQueue, true, true),
            (RoomEventType::AddToQueue, false, false),
            (RoomEventType::Play, false, false),
            (RoomEventType::Other("joinRoom".into()), false, false),
        ];
        for (kind, with_video, undoable) in cases {
            let parameters = EventParameters {
                video: with_video.then(Video::default),
                ..Default::default()
            };
            let event = RoomEvent::from_server(server_event(kind.clone(), parameters));
            assert!(event.is_visible);
            assert_eq!(event.is_undoable, undoable, "{kind}");
            let expected = if undoable {
                UNDOABLE_EVENT_TIMEOUT
            } else {
                EVENT_TIMEOUT
            };
            assert_eq!(event.timeout, expected, "{kind}");
        }
    }

    #[test]
    fn consecutive_visible_seeks_coalesce() {
        let mut queue = EventQueue::new();
        assert_eq!(queue.push(seek(10.0)), Enqueued::Appended);
        assert_eq!(queue.push(seek(42.0)), Enqueued::Coalesced);

        assert_eq!(queue.len(), 1);
        let only = &queue.as_slice()[0];
        assert_eq!(only.parameters.position, Some(42.0));
        assert_eq!(only.timeout, Duration::from_millis(7001));
    }

    #[test]
    fn seek_after_hidden_seek_appends() {
        let mut queue = EventQueue::new();
        queue.push(seek(10.0));
        assert!(queue.dismiss(0));
        assert_eq!(queue.push(seek(42.0)), Enqueued::Appended);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.as_slice()[1].parameters.position, Some(42.0));
    }

    #[test]
    fn seek_on_empty_queue_appends() {
        let mut queue = EventQueue::new();
        assert_eq!(queue.push(seek(1.0)), Enqueued::Appended);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn seek_after_other_event_appends() {
        let mut queue = EventQueue::new();
        queue.push(RoomEvent::from_server(server_event(
            RoomEventType::Skip,
            EventParameters::default(),
        )));
        assert_eq!(queue.push(seek(5.0)), Enqueued::Appended);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn dismiss_out_of_range_is_reported() {
        let mut queue = EventQueue::new();
        assert!(!queue.dismiss(3));
    }

    #[test]
    fn record_serializes_timeout_in_millis() {
        let json = serde_json::to_value(seek(3.0)).unwrap();
        assert_eq!(json["eventType"], "seek");
        assert_eq!(json["timeout"], 7000);
        assert_eq!(json["isUndoable"], true);
    }
}
