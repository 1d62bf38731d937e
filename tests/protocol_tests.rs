#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Wire-format tests against captured server payloads.
//!
//! Each fixture is a message as the room server actually sends it; the tests
//! check that it decodes into the expected types, that fields the client does
//! not model survive, and that what the client sends matches what the server
//! expects.

use ott_client::event_queue::{RoomEvent, EVENT_TIMEOUT, UNDOABLE_EVENT_TIMEOUT};
use ott_client::permissions::PermissionsMetadata;
use ott_client::protocol::{
    ClientMessage, PlayerStatus, QueueMode, RoomEventType, RoomSync, ServerMessage,
};
use ott_client::RoomSnapshot;
use serde_json::json;

fn decode(value: serde_json::Value) -> ServerMessage {
    serde_json::from_value(value).expect("server message should decode")
}

fn sync_of(value: serde_json::Value) -> RoomSync {
    match decode(value) {
        ServerMessage::Sync(sync) => sync,
        other => panic!("expected Sync, got {other:?}"),
    }
}

fn event_of(value: serde_json::Value) -> RoomEvent {
    match decode(value) {
        ServerMessage::Event { event } => RoomEvent::from_server(event),
        other => panic!("expected Event, got {other:?}"),
    }
}

// ════════════════════════════════════════════════════════════════════
// Sync
// ════════════════════════════════════════════════════════════════════

#[test]
fn full_room_sync_decodes() {
    let sync = sync_of(json!({
        "action": "sync",
        "name": "late-night",
        "title": "",
        "description": "",
        "isTemporary": true,
        "queueMode": "vote",
        "currentSource": {},
        "queue": [
            {
                "service": "vimeo",
                "id": "94338566",
                "title": "Sintel",
                "thumbnail": "https://i.vimeocdn.com/video/477.jpg",
                "length": 888,
                "votes": 3
            },
            { "service": "youtube", "id": "aqz-KE-bpKQ", "title": "Big Buck Bunny" }
        ],
        "isPlaying": false,
        "playbackPosition": 0,
        "hasOwner": true,
        "grants": 1099511627775u64,
        "users": [
            { "id": "c9", "name": "mallory", "isLoggedIn": false, "role": 0, "isYou": true, "status": "buffering" }
        ]
    }));

    assert_eq!(sync.name.as_deref(), Some("late-night"));
    assert_eq!(sync.is_temporary, Some(true));
    assert_eq!(sync.queue_mode, Some(QueueMode::Vote));
    assert_eq!(sync.current_source.as_ref().and_then(|v| v.id.clone()), None);
    assert_eq!(sync.grants, Some(1_099_511_627_775));

    let queue = sync.queue.expect("queue");
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].length, Some(888.0));
    assert_eq!(queue[0].extra.get("votes"), Some(&json!(3)));
    assert!(queue[1].thumbnail.is_none());

    let users = sync.users.expect("users");
    assert!(users[0].is_you);
    assert_eq!(users[0].status, Some(PlayerStatus::Buffering));
}

#[test]
fn every_queue_mode_decodes() {
    for (wire, mode) in [
        ("manual", QueueMode::Manual),
        ("vote", QueueMode::Vote),
        ("loop", QueueMode::Loop),
        ("dj", QueueMode::Dj),
    ] {
        let sync = sync_of(json!({ "action": "sync", "queueMode": wire }));
        assert_eq!(sync.queue_mode, Some(mode), "queue mode {wire}");
    }
}

#[test]
fn unknown_queue_mode_is_rejected() {
    let result =
        serde_json::from_value::<ServerMessage>(json!({ "action": "sync", "queueMode": "shuffle" }));
    assert!(result.is_err());
}

#[test]
fn sync_fixture_merges_into_snapshot() {
    let base = RoomSnapshot::default().merged(sync_of(json!({
        "action": "sync",
        "name": "late-night",
        "title": "Late Night",
        "isPlaying": true,
        "playbackPosition": 120.5,
        "autoSkipSegments": true
    })));

    let next = base.merged(sync_of(json!({
        "action": "sync",
        "title": "Later Night",
        "voteCounts": { "aqz-KE-bpKQ": 2 }
    })));

    assert_eq!(next.name, "late-night");
    assert_eq!(next.title, "Later Night");
    assert!(next.is_playing);
    assert_eq!(next.playback_position, 120.5);
    assert_eq!(next.extra.get("autoSkipSegments"), Some(&json!(true)));
    assert_eq!(next.extra.get("voteCounts"), Some(&json!({ "aqz-KE-bpKQ": 2 })));
    assert!(!next.extra.contains_key("action"));
}

// ════════════════════════════════════════════════════════════════════
// Chat and events
// ════════════════════════════════════════════════════════════════════

#[test]
fn chat_message_decodes_with_sender() {
    let msg = decode(json!({
        "action": "chat",
        "from": { "name": "alice", "isLoggedIn": true, "role": 4 },
        "text": "brb"
    }));
    let ServerMessage::Chat(chat) = msg else {
        panic!("expected Chat, got {msg:?}");
    };
    assert_eq!(chat.from.name, "alice");
    assert!(chat.from.is_logged_in);
    assert_eq!(chat.from.extra.get("role"), Some(&json!(4)));
    assert_eq!(chat.text, "brb");
}

#[test]
fn add_single_video_is_undoable() {
    let event = event_of(json!({
        "action": "event",
        "event": {
            "eventType": "addToQueue",
            "userName": "bob",
            "parameters": {
                "video": { "service": "youtube", "id": "aqz-KE-bpKQ" },
                "queueIdx": 2
            }
        }
    }));
    assert_eq!(event.event_type, RoomEventType::AddToQueue);
    assert!(event.is_undoable);
    assert_eq!(event.timeout, UNDOABLE_EVENT_TIMEOUT);
    assert_eq!(event.parameters.extra.get("queueIdx"), Some(&json!(2)));
}

#[test]
fn add_playlist_is_not_undoable() {
    let event = event_of(json!({
        "action": "event",
        "event": {
            "eventType": "addToQueue",
            "userName": "bob",
            "parameters": { "videos": [{ "id": "a" }, { "id": "b" }] }
        }
    }));
    assert!(!event.is_undoable);
    assert_eq!(event.timeout, EVENT_TIMEOUT);
}

#[test]
fn play_event_is_not_undoable() {
    let event = event_of(json!({
        "action": "event",
        "event": { "eventType": "play", "userName": "carol", "parameters": {} }
    }));
    assert_eq!(event.event_type, RoomEventType::Play);
    assert!(!event.is_undoable);
    assert!(event.is_visible);
}

#[test]
fn event_without_parameters_decodes() {
    let event = event_of(json!({
        "action": "event",
        "event": { "eventType": "joinRoom" }
    }));
    assert_eq!(event.event_type, RoomEventType::Other("joinRoom".into()));
    assert!(event.user_name.is_none());
    assert_eq!(event.parameters, Default::default());
}

#[test]
fn room_event_serializes_for_views() {
    let event = event_of(json!({
        "action": "event",
        "event": {
            "eventType": "seek",
            "userName": "dave",
            "parameters": { "position": 61.5, "prevPosition": 10 }
        }
    }));
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({
            "eventType": "seek",
            "userName": "dave",
            "parameters": { "position": 61.5, "prevPosition": 10 },
            "isVisible": true,
            "isUndoable": true,
            "timeout": 7000
        })
    );
}

// ════════════════════════════════════════════════════════════════════
// Other server messages
// ════════════════════════════════════════════════════════════════════

#[test]
fn announcement_and_error_decode() {
    assert_eq!(
        decode(json!({ "action": "announcement", "text": "Server restarting" })),
        ServerMessage::Announcement {
            text: "Server restarting".into()
        }
    );
    assert_eq!(
        decode(json!({ "action": "error", "error": "Room is full" })),
        ServerMessage::Error {
            error: "Room is full".into()
        }
    );
}

#[test]
fn future_actions_decode_as_unknown() {
    assert_eq!(
        decode(json!({ "action": "user", "user": { "name": "erin" } })),
        ServerMessage::Unknown
    );
}

#[test]
fn message_without_action_is_rejected() {
    assert!(serde_json::from_value::<ServerMessage>(json!({ "text": "hi" })).is_err());
}

// ════════════════════════════════════════════════════════════════════
// Client messages
// ════════════════════════════════════════════════════════════════════

#[test]
fn status_messages_match_server_expectations() {
    for (status, wire) in [
        (PlayerStatus::None, "none"),
        (PlayerStatus::Ready, "ready"),
        (PlayerStatus::Buffering, "buffering"),
        (PlayerStatus::Error, "error"),
    ] {
        assert_eq!(
            serde_json::to_value(ClientMessage::Status { status }).unwrap(),
            json!({ "action": "status", "status": wire })
        );
    }
}

// ════════════════════════════════════════════════════════════════════
// HTTP payloads
// ════════════════════════════════════════════════════════════════════

#[test]
fn permissions_metadata_decodes() {
    let metadata: PermissionsMetadata = serde_json::from_value(json!({
        "roles": [
            { "id": -1, "name": "admin", "display": "Administrator" },
            { "id": 0, "name": "unregistered", "display": "Unregistered User" },
            { "id": 1, "name": "registered", "display": "Registered User" }
        ],
        "permissions": [
            { "name": "playback.play-pause", "mask": 1, "minRole": 0 },
            { "name": "manage-queue.add", "mask": 4, "minRole": 0 },
            { "name": "configure-room.set-title", "mask": 4096, "minRole": 1 }
        ]
    }))
    .unwrap();

    assert_eq!(metadata.roles.len(), 3);
    assert_eq!(metadata.roles[0].id, -1);
    assert_eq!(metadata.permissions[2].mask, 4096);
    assert_eq!(metadata.permissions[2].min_role, 1);
}
