//! The client's copy of the room state.

use serde_json::{Map, Value};

use crate::event_queue::EventQueue;
use crate::protocol::{ChatMessage, QueueMode, RoomSync, RoomUser, Video};

/// Full room state as last seen by this client.
///
/// Snapshots are immutable once published: a sync produces a new snapshot via
/// [`merged`](RoomSnapshot::merged) rather than editing one in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomSnapshot {
    pub name: String,
    pub title: String,
    pub description: String,
    pub is_temporary: bool,
    pub queue_mode: QueueMode,
    pub current_source: Video,
    pub queue: Vec<Video>,
    pub is_playing: bool,
    /// Playback position in seconds at the last sync that carried one.
    pub playback_position: f64,
    pub has_owner: bool,
    pub grants: u64,
    pub users: Vec<RoomUser>,
    pub chat_messages: Vec<ChatMessage>,
    pub events: EventQueue,
    /// Server fields the client does not model.
    pub extra: Map<String, Value>,
}

impl RoomSnapshot {
    /// Return a new snapshot with every field present in `sync` overwritten.
    ///
    /// Fields absent from `sync` keep their current value. Chat and event logs
    /// are client-side and never touched by a sync.
    pub fn merged(&self, sync: RoomSync) -> Self {
        let RoomSync {
            name,
            title,
            description,
            is_temporary,
            queue_mode,
            current_source,
            queue,
            is_playing,
            playback_position,
            has_owner,
            grants,
            users,
            mut extra,
        } = sync;

        let mut next = self.clone();
        if let Some(name) = name {
            next.name = name;
        }
        if let Some(title) = title {
            next.title = title;
        }
        if let Some(description) = description {
            next.description = description;
        }
        if let Some(is_temporary) = is_temporary {
            next.is_temporary = is_temporary;
        }
        if let Some(queue_mode) = queue_mode {
            next.queue_mode = queue_mode;
        }
        if let Some(current_source) = current_source {
            next.current_source = current_source;
        }
        if let Some(queue) = queue {
            next.queue = queue;
        }
        if let Some(is_playing) = is_playing {
            next.is_playing = is_playing;
        }
        if let Some(playback_position) = playback_position {
            next.playback_position = playback_position;
        }
        if let Some(has_owner) = has_owner {
            next.has_owner = has_owner;
        }
        if let Some(grants) = grants {
            next.grants = grants;
        }
        if let Some(users) = users {
            next.users = users;
        }

        // The action tag names the message, it is not room state.
        extra.remove("action");
        next.extra.extend(extra);
        next
    }

    /// The user entry the server flagged as this client.
    pub fn you(&self) -> Option<&RoomUser> {
        self.users.iter().find(|user| user.is_you)
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

    fn populated() -> RoomSnapshot {
        RoomSnapshot {
            name: "movie-night".into(),
            title: "Movie Night".into(),
            description: "weekly".into(),
            is_temporary: false,
            queue_mode: QueueMode::Vote,
            current_source: Video {
                service: Some("youtube".into()),
                id: Some("abc".into()),
                ..Default::default()
            },
            queue: vec![Video::default()],
            is_playing: true,
            playback_position: 12.5,
            has_owner: true,
            grants: 0b1011,
            users: vec![RoomUser {
                name: "alice".into(),
                is_you: true,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn empty_sync_changes_nothing() {
        let before = populated();
        let after = before.merged(RoomSync::default());
        assert_eq!(before, after);
    }

    #[test]
    fn each_absent_field_keeps_prior_value() {
        let before = populated();
        let after = before.merged(RoomSync {
            title: Some("Retitled".into()),
            playback_position: Some(99.0),
            ..Default::default()
        });

        assert_eq!(after.title, "Retitled");
        assert_eq!(after.playback_position, 99.0);
        assert_eq!(after.name, before.name);
        assert_eq!(after.description, before.description);
        assert_eq!(after.queue_mode, before.queue_mode);
        assert_eq!(after.current_source, before.current_source);
        assert_eq!(after.queue, before.queue);
        assert_eq!(after.is_playing, before.is_playing);
        assert_eq!(after.grants, before.grants);
        assert_eq!(after.users, before.users);
    }

    #[test]
    fn unknown_fields_merge_last_write_wins() {
        let mut first = Map::new();
        first.insert("playbackSpeed".into(), Value::from(1.0));
        first.insert("action".into(), Value::from("sync"));
        let snapshot = RoomSnapshot::default().merged(RoomSync {
            extra: first,
            ..Default::default()
        });
        assert_eq!(snapshot.extra.get("playbackSpeed"), Some(&Value::from(1.0)));
        assert!(!snapshot.extra.contains_key("action"));

        let mut second = Map::new();
        second.insert("playbackSpeed".into(), Value::from(2.0));
        let snapshot = snapshot.merged(RoomSync {
            extra: second,
            ..Default::default()
        });
        assert_eq!(snapshot.extra.get("playbackSpeed"), Some(&Value::from(2.0)));
    }

    #[test]
    fn you_finds_flagged_user() {
        let snapshot = populated();
        assert_eq!(snapshot.you().unwrap().name, "alice");
        assert!(RoomSnapshot::default().you().is_none());
    }
}
