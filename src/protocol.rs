//! Wire-compatible protocol types for the room socket.
//!
//! Every message on the socket is a JSON object whose `action` field names the
//! message kind. Inbound messages map onto [`ServerMessage`], outbound ones onto
//! [`ClientMessage`]. Key adaptations:
//!
//! - Field names are `camelCase` on the wire.
//! - Room state updates are partial: every field of [`RoomSync`] is optional and
//!   unknown fields are preserved in an `extra` map instead of being rejected.
//! - Event types the client has no special handling for survive as
//!   [`RoomEventType::Other`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Type aliases ────────────────────────────────────────────────────

/// Numeric role identifier assigned by the server (e.g. `0` = unregistered user).
pub type RoleId = i32;

/// Close code the server uses when the requested room does not exist.
pub const CLOSE_ROOM_NOT_FOUND: u16 = 4002;

// ── Enums ───────────────────────────────────────────────────────────

/// How the room's queue is ordered and consumed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    /// Videos play in the order they were added.
    #[default]
    Manual,
    /// Videos are ordered by votes.
    Vote,
    /// Finished videos are re-added to the end of the queue.
    Loop,
    /// The current video restarts when it ends.
    Dj,
}

/// Local media player status, reported to the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    None,
    Ready,
    Buffering,
    Error,
}

/// The kind of a transient room event.
///
/// Serialized as the bare event type string (e.g. `"seek"`, `"addToQueue"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoomEventType {
    Play,
    Pause,
    Seek,
    Skip,
    AddToQueue,
    RemoveFromQueue,
    /// Any event type without client-side special handling.
    Other(String),
}

impl RoomEventType {
    /// Returns the wire name of this event type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek => "seek",
            Self::Skip => "skip",
            Self::AddToQueue => "addToQueue",
            Self::RemoveFromQueue => "removeFromQueue",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for RoomEventType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "play" => Self::Play,
            "pause" => Self::Pause,
            "seek" => Self::Seek,
            "skip" => Self::Skip,
            "addToQueue" => Self::AddToQueue,
            "removeFromQueue" => Self::RemoveFromQueue,
            _ => Self::Other(name),
        }
    }
}

impl From<RoomEventType> for String {
    fn from(kind: RoomEventType) -> Self {
        match kind {
            RoomEventType::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RoomEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Structs ─────────────────────────────────────────────────────────

/// A playable video, as found in the queue or as the current source.
///
/// An empty object (`{}`) means "nothing".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Video {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user present in the room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub is_logged_in: bool,
    pub role: RoleId,
    /// Set by the server on exactly the entry that represents this client.
    pub is_you: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PlayerStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial room state pushed by the server.
///
/// Absent fields leave the local value untouched. Fields the client does not
/// model are kept in `extra` and merged last-write-wins like the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomSync {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_temporary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_mode: Option<QueueMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_source: Option<Video>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<Vec<Video>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    /// Playback position in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_owner: Option<bool>,
    /// Permission grant bitmask for this client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grants: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<RoomUser>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Author of a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatSender {
    pub name: String,
    pub is_logged_in: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A chat message relayed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ChatMessage {
    pub from: ChatSender,
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parameters attached to a room event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EventParameters {
    /// Target position of a `seek`, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    /// The video concerned by a queue change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A room event as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    pub event_type: RoomEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub parameters: EventParameters,
}

/// Information carried by a socket close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// Returns `true` if the server closed because the room does not exist.
    pub fn is_room_not_found(&self) -> bool {
        self.code == CLOSE_ROOM_NOT_FOUND
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Keep-alive heartbeat.
    Ping,
    /// Local player status changed.
    Status { status: PlayerStatus },
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Incremental room state update.
    Sync(RoomSync),
    /// A chat message.
    Chat(ChatMessage),
    /// A transient room event (seek, skip, queue change, ...).
    Event { event: ServerEvent },
    /// A server-wide announcement.
    Announcement { text: String },
    /// An application error reported by the server.
    Error { error: String },
    /// Any action this client does not understand.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
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

    #[test]
    fn sync_keeps_absent_fields_as_none() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"action":"sync","isPlaying":true}"#).unwrap();
        let ServerMessage::Sync(sync) = msg else {
            panic!("expected Sync, got {msg:?}");
        };
        assert_eq!(sync.is_playing, Some(true));
        assert!(sync.playback_position.is_none());
        assert!(sync.users.is_none());
        assert!(sync.extra.is_empty());
    }

    #[test]
    fn sync_preserves_unknown_fields() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"action":"sync","playbackSpeed":1.5,"votingEnabled":true}"#)
                .unwrap();
        let ServerMessage::Sync(sync) = msg else {
            panic!("expected Sync");
        };
        assert_eq!(sync.extra.get("playbackSpeed"), Some(&serde_json::json!(1.5)));
        assert_eq!(sync.extra.get("votingEnabled"), Some(&Value::Bool(true)));
        assert!(!sync.extra.contains_key("action"));
    }

    #[test]
    fn unknown_action_is_tolerated() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"action":"somethingNew","foo":1}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn event_type_falls_back_to_other() {
        let kind: RoomEventType = serde_json::from_str(r#""joinRoom""#).unwrap();
        assert_eq!(kind, RoomEventType::Other("joinRoom".into()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""joinRoom""#);
        assert_eq!(
            serde_json::to_string(&RoomEventType::AddToQueue).unwrap(),
            r#""addToQueue""#
        );
    }

    #[test]
    fn ping_serializes_as_bare_action() {
        let json = serde_json::to_value(ClientMessage::Ping).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "ping" }));
    }

    #[test]
    fn room_not_found_close_code() {
        let close = CloseInfo {
            code: 4002,
            reason: String::new(),
        };
        assert!(close.is_room_not_found());
        let normal = CloseInfo {
            code: 1000,
            reason: String::new(),
        };
        assert!(!normal.is_room_not_found());
    }
}
