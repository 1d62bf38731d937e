//! The room store: the client's single source of local truth.
//!
//! [`RoomStore`] owns every piece of client state and is the only place it is
//! mutated. Socket lifecycle callbacks and inbound messages come in through the
//! `on_*` methods, user actions through the rest. Every mutation bumps the
//! revision on the [`EventSink`]; one-shot notifications go out as
//! [`RoomClientEvent`]s.
//!
//! All methods are synchronous and run to completion. The only work that
//! outlives a call is the keep-alive timer and the fire-and-forget username
//! claim spawned by [`on_open`](RoomStore::on_open).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::error::{OttError, Result};
use crate::event::{EventSink, RoomClientEvent};
use crate::event_queue::{Enqueued, RoomEvent};
use crate::keepalive::KeepAlive;
use crate::outbox::Outbox;
use crate::protocol::{
    ChatMessage, ClientMessage, CloseInfo, PlayerStatus, RoleId, RoomSync, ServerEvent,
    ServerMessage, Video,
};
use crate::room::RoomSnapshot;
use crate::storage::{LegacyStorage, LEGACY_USERNAME_KEY};

/// Reason recorded when the server closes with
/// [`CLOSE_ROOM_NOT_FOUND`](crate::protocol::CLOSE_ROOM_NOT_FOUND).
pub const ROOM_NOT_FOUND_REASON: &str = "Room does not exist.";

// ── State ───────────────────────────────────────────────────────────

/// Socket status as seen by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub is_connected: bool,
    /// Raw text of the last inbound message.
    pub message: String,
    /// Set once reconnection gave up. Never cleared.
    pub reconnect_error: bool,
}

/// A registered account, as returned by the server's login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AccountUser {
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A buffered time range of the current video, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BufferSpan {
    pub start: f64,
    pub end: f64,
}

/// Everything the store tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub player_status: Option<PlayerStatus>,
    /// Fraction of the current video buffered, `0.0..=1.0`.
    pub player_buffer_percent: Option<f64>,
    pub player_buffer_spans: Option<Vec<BufferSpan>>,
    pub socket: ConnectionState,
    pub join_failure_reason: Option<String>,
    /// Display name of an unregistered user.
    pub username: Option<String>,
    /// Logged-in account, if any.
    pub user: Option<AccountUser>,
    pub your_role: RoleId,
    pub room: Arc<RoomSnapshot>,
    /// When the last sync carrying a playback position was applied. The view
    /// extrapolates the current position from this.
    pub playback_start_time: Option<DateTime<Utc>>,
    /// Videos offered to the user for adding to the queue.
    pub quick_add: Vec<Video>,
}

/// What the connection loop should do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// The close is not fatal; reconnect if enabled.
    Reconnect,
    /// Tear down for good.
    Stop,
}

// ── Store ───────────────────────────────────────────────────────────

/// Mutable client state plus the handles needed to act on it.
pub struct RoomStore {
    state: StoreState,
    outbox: Outbox,
    sink: EventSink,
    keep_alive: KeepAlive,
    api: Arc<dyn ApiClient>,
    storage: Arc<dyn LegacyStorage>,
}

impl RoomStore {
    pub fn new(
        outbox: Outbox,
        sink: EventSink,
        keep_alive_interval: Duration,
        api: Arc<dyn ApiClient>,
        storage: Arc<dyn LegacyStorage>,
    ) -> Self {
        Self {
            state: StoreState::default(),
            outbox,
            sink,
            keep_alive: KeepAlive::new(keep_alive_interval),
            api,
            storage,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn room(&self) -> Arc<RoomSnapshot> {
        Arc::clone(&self.state.room)
    }

    pub fn is_connected(&self) -> bool {
        self.state.socket.is_connected
    }

    pub fn keep_alive_active(&self) -> bool {
        self.keep_alive.is_active()
    }

    // ── Connection lifecycle ────────────────────────────────────────

    /// The socket opened.
    pub fn on_open(&mut self) {
        info!("room socket open");
        self.state.join_failure_reason = None;
        self.state.socket.is_connected = true;
        {
            let room = Arc::make_mut(&mut self.state.room);
            room.chat_messages.clear();
            room.events.clear();
        }
        self.migrate_legacy_username();
        self.keep_alive.restart(self.outbox.clone());
        self.sink.changed();
    }

    /// The socket closed. `close` is `None` when no close frame was received.
    pub fn on_close(&mut self, close: Option<&CloseInfo>) -> CloseDisposition {
        info!(?close, "room socket closed");
        self.state.socket.is_connected = false;
        self.keep_alive.cancel();

        let disposition = match close {
            Some(close) if close.is_room_not_found() => {
                self.state.join_failure_reason = Some(ROOM_NOT_FOUND_REASON.to_string());
                self.sink.emit(RoomClientEvent::RoomJoinFailure {
                    reason: ROOM_NOT_FOUND_REASON.to_string(),
                });
                CloseDisposition::Stop
            }
            _ => CloseDisposition::Reconnect,
        };
        self.sink.changed();
        disposition
    }

    /// The socket reported an error.
    pub fn on_error(&mut self, err: &OttError) {
        error!("room socket error: {err}");
    }

    /// A reconnection attempt is starting.
    pub fn on_reconnect(&mut self, attempt: u32) {
        info!(attempt, "reconnecting to room");
    }

    /// Reconnection gave up.
    pub fn on_reconnect_error(&mut self) {
        warn!("giving up on reconnecting to room");
        self.state.socket.reconnect_error = true;
        self.sink.changed();
    }

    /// Raw text arrived on the socket.
    pub fn on_message(&mut self, text: &str) {
        self.state.socket.message = text.to_string();
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => self.dispatch(message),
            Err(e) => warn!("failed to deserialize server message: {e}, raw: {text}"),
        }
        self.sink.changed();
    }

    /// Route a parsed server message to its handler.
    pub fn dispatch(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Sync(sync) => self.sync(sync),
            ServerMessage::Chat(chat) => self.chat(chat),
            ServerMessage::Event { event } => self.event(event),
            ServerMessage::Announcement { text } => self.announcement(text),
            ServerMessage::Error { error } => self.server_error(error),
            ServerMessage::Unknown => debug!("ignoring server message with unknown action"),
        }
    }

    // ── Inbound handlers ────────────────────────────────────────────

    /// Merge a partial room update.
    pub fn sync(&mut self, sync: RoomSync) {
        debug!(?sync, "sync");
        if let Some(is_playing) = sync.is_playing {
            if is_playing != self.state.room.is_playing {
                self.sink.emit(if is_playing {
                    RoomClientEvent::PlayVideo
                } else {
                    RoomClientEvent::PauseVideo
                });
            }
        }
        if sync.playback_position.is_some() {
            debug!("setting playback start time");
            self.state.playback_start_time = Some(Utc::now());
        }

        self.state.room = Arc::new(self.state.room.merged(sync));

        if self.state.user.is_none() {
            match self.state.room.you() {
                Some(you) => {
                    self.state.username = Some(you.name.clone());
                    self.state.your_role = you.role;
                }
                None => debug!("no user flagged as us in sync, keeping local identity"),
            }
        }

        self.sink.emit(RoomClientEvent::Sync);
        self.sink.changed();
    }

    /// Append a chat message.
    pub fn chat(&mut self, message: ChatMessage) {
        Arc::make_mut(&mut self.state.room)
            .chat_messages
            .push(message);
        self.sink.changed();
    }

    /// Queue a room event.
    pub fn event(&mut self, event: ServerEvent) {
        let record = RoomEvent::from_server(event);
        let enqueued = Arc::make_mut(&mut self.state.room)
            .events
            .push(record.clone());
        if enqueued == Enqueued::Coalesced {
            debug!("coalesced seek into visible seek event");
        }
        self.sink.emit(RoomClientEvent::RoomEvent(record));
        self.sink.changed();
    }

    pub fn announcement(&mut self, text: String) {
        self.sink.emit(RoomClientEvent::Announcement { text });
    }

    pub fn server_error(&mut self, message: String) {
        warn!("server sent error: {message}");
        self.sink.emit(RoomClientEvent::Error { message });
    }

    // ── User actions ────────────────────────────────────────────────

    /// Record the local player's status and report it to the server.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::NotConnected`] while the socket is down. The status
    /// is recorded either way.
    pub fn set_playback_status(&mut self, status: PlayerStatus) -> Result<()> {
        self.state.player_status = Some(status);
        self.sink.changed();
        self.ensure_connected()?;
        self.outbox.send(ClientMessage::Status { status })
    }

    pub fn set_playback_buffer(&mut self, percent: f64) {
        self.state.player_buffer_percent = Some(percent);
        self.sink.changed();
    }

    pub fn set_playback_buffer_spans(&mut self, spans: Vec<BufferSpan>) {
        self.state.player_buffer_spans = Some(spans);
        self.sink.changed();
    }

    /// Send raw text on the socket.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::NotConnected`] while the socket is down.
    pub fn send_message(&self, text: impl Into<String>) -> Result<()> {
        self.ensure_connected()?;
        self.outbox.send_raw(text)
    }

    pub fn login(&mut self, user: AccountUser) {
        self.state.user = Some(user);
        self.sink.changed();
    }

    pub fn logout(&mut self) {
        self.state.user = None;
        self.sink.changed();
    }

    pub fn quick_add(&mut self, video: Video) {
        self.state.quick_add.push(video);
        self.sink.changed();
    }

    pub fn clear_quick_add(&mut self) {
        self.state.quick_add.clear();
        self.sink.changed();
    }

    /// Hide the event at `index` once the view has timed it out.
    pub fn dismiss_event(&mut self, index: usize) -> bool {
        let dismissed = Arc::make_mut(&mut self.state.room).events.dismiss(index);
        if dismissed {
            self.sink.changed();
        }
        dismissed
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<()> {
        if self.state.socket.is_connected {
            Ok(())
        } else {
            Err(OttError::NotConnected)
        }
    }

    /// Move a username stored by an older client to the server.
    fn migrate_legacy_username(&mut self) {
        if self.state.user.is_some() {
            return;
        }
        let username = match self.storage.take(LEGACY_USERNAME_KEY) {
            Ok(Some(username)) => username,
            Ok(None) => return,
            Err(e) => {
                warn!("could not read legacy username: {e}");
                return;
            }
        };
        info!(%username, "migrating legacy username to server");
        self.state.username = Some(username.clone());
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.claim_username(&username).await {
                warn!("failed to claim legacy username: {e}");
            }
        });
    }
}

impl std::fmt::Debug for RoomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomStore")
            .field("state", &self.state)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::keepalive::DEFAULT_KEEP_ALIVE_INTERVAL;
    use crate::outbox::Outbound;
    use crate::permissions::PermissionsMetadata;
    use crate::protocol::{EventParameters, RoomEventType, RoomUser};
    use crate::storage::{MemoryStorage, NoStorage};
    use async_trait::async_trait;
    use tokio::sync::{mpsc, watch};

    // ── Mock API ────────────────────────────────────────────────────

    struct RecordingApi {
        claimed: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl ApiClient for RecordingApi {
        async fn claim_username(&self, username: &str) -> Result<()> {
            let _ = self.claimed.send(username.to_string());
            Ok(())
        }

        async fn fetch_permissions(&self) -> Result<PermissionsMetadata> {
            Ok(PermissionsMetadata::default())
        }
    }

    struct Harness {
        store: RoomStore,
        events: mpsc::Receiver<RoomClientEvent>,
        outbound: mpsc::UnboundedReceiver<Outbound>,
        revision: watch::Receiver<u64>,
        claimed: mpsc::UnboundedReceiver<String>,
    }

    fn harness_with_storage(storage: Arc<dyn LegacyStorage>) -> Harness {
        let (outbox, outbound) = Outbox::channel();
        let (sink, events, revision) = EventSink::channel(64);
        let (claimed_tx, claimed) = mpsc::unbounded_channel();
        let api = Arc::new(RecordingApi { claimed: claimed_tx });
        let store = RoomStore::new(outbox, sink, DEFAULT_KEEP_ALIVE_INTERVAL, api, storage);
        Harness {
            store,
            events,
            outbound,
            revision,
            claimed,
        }
    }

    fn harness() -> Harness {
        harness_with_storage(Arc::new(NoStorage))
    }

    fn drain(events: &mut mpsc::Receiver<RoomClientEvent>) -> Vec<RoomClientEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn user(name: &str, role: RoleId, is_you: bool) -> RoomUser {
        RoomUser {
            name: name.into(),
            role,
            is_you,
            ..Default::default()
        }
    }

    fn seek_event(position: f64) -> ServerEvent {
        ServerEvent {
            event_type: RoomEventType::Seek,
            user_name: None,
            parameters: EventParameters {
                position: Some(position),
                ..Default::default()
            },
        }
    }

    // ── Reconciler ──────────────────────────────────────────────────

    #[tokio::test]
    async fn sync_play_from_paused() {
        let mut h = harness();
        let before = Utc::now();

        h.store.on_message(r#"{"action":"sync","isPlaying":true,"playbackPosition":42}"#);

        assert_eq!(
            drain(&mut h.events),
            vec![RoomClientEvent::PlayVideo, RoomClientEvent::Sync]
        );
        let state = h.store.state();
        assert!(state.room.is_playing);
        assert_eq!(state.room.playback_position, 42.0);
        assert!(state.playback_start_time.unwrap() >= before);
        assert!(*h.revision.borrow() > 0);
    }

    #[tokio::test]
    async fn play_pause_is_edge_triggered() {
        let mut h = harness();
        h.store.sync(RoomSync {
            is_playing: Some(false),
            ..Default::default()
        });
        assert_eq!(drain(&mut h.events), vec![RoomClientEvent::Sync]);

        h.store.sync(RoomSync {
            is_playing: Some(true),
            ..Default::default()
        });
        h.store.sync(RoomSync {
            is_playing: Some(true),
            ..Default::default()
        });
        h.store.sync(RoomSync {
            is_playing: Some(false),
            ..Default::default()
        });

        assert_eq!(
            drain(&mut h.events),
            vec![
                RoomClientEvent::PlayVideo,
                RoomClientEvent::Sync,
                RoomClientEvent::Sync,
                RoomClientEvent::PauseVideo,
                RoomClientEvent::Sync,
            ]
        );
    }

    #[tokio::test]
    async fn sync_without_position_keeps_start_time() {
        let mut h = harness();
        h.store.sync(RoomSync {
            title: Some("t".into()),
            ..Default::default()
        });
        assert!(h.store.state().playback_start_time.is_none());
    }

    #[tokio::test]
    async fn sync_replaces_snapshot() {
        let mut h = harness();
        let old = h.store.room();
        h.store.sync(RoomSync {
            title: Some("Movie Night".into()),
            ..Default::default()
        });
        let new = h.store.room();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(old.title, "");
        assert_eq!(new.title, "Movie Night");
    }

    #[tokio::test]
    async fn identity_adopted_from_flagged_user() {
        let mut h = harness();
        h.store.sync(RoomSync {
            users: Some(vec![user("alice", 2, false), user("bob", 1, true)]),
            ..Default::default()
        });
        assert_eq!(h.store.state().username.as_deref(), Some("bob"));
        assert_eq!(h.store.state().your_role, 1);
    }

    #[tokio::test]
    async fn missing_flagged_user_keeps_identity() {
        let mut h = harness();
        h.store.sync(RoomSync {
            users: Some(vec![user("bob", 3, true)]),
            ..Default::default()
        });
        h.store.sync(RoomSync {
            users: Some(vec![user("alice", 2, false)]),
            ..Default::default()
        });
        assert_eq!(h.store.state().username.as_deref(), Some("bob"));
        assert_eq!(h.store.state().your_role, 3);
    }

    #[tokio::test]
    async fn logged_in_account_skips_identity_adoption() {
        let mut h = harness();
        h.store.login(AccountUser {
            username: "carol".into(),
            ..Default::default()
        });
        h.store.sync(RoomSync {
            users: Some(vec![user("Guest 12", 0, true)]),
            ..Default::default()
        });
        assert!(h.store.state().username.is_none());

        h.store.logout();
        h.store.sync(RoomSync::default());
        assert_eq!(h.store.state().username.as_deref(), Some("Guest 12"));
    }

    // ── Event queue ─────────────────────────────────────────────────

    #[tokio::test]
    async fn consecutive_seeks_coalesce_in_room() {
        let mut h = harness();
        h.store.event(seek_event(10.0));
        h.store.event(seek_event(30.0));

        let room = h.store.room();
        assert_eq!(room.events.len(), 1);
        let event = &room.events.as_slice()[0];
        assert_eq!(event.parameters.position, Some(30.0));
        assert_eq!(event.timeout, Duration::from_millis(7001));

        let emitted = drain(&mut h.events);
        assert_eq!(emitted.len(), 2);
        let RoomClientEvent::RoomEvent(second) = &emitted[1] else {
            panic!("expected RoomEvent, got {:?}", emitted[1]);
        };
        assert_eq!(second.parameters.position, Some(30.0));
        assert_eq!(second.timeout, Duration::from_millis(7000));
    }

    #[tokio::test]
    async fn seek_after_dismissed_seek_appends() {
        let mut h = harness();
        h.store.on_message(
            r#"{"action":"event","event":{"eventType":"seek","userName":"a","parameters":{"position":5}}}"#,
        );
        assert!(h.store.dismiss_event(0));
        h.store.on_message(
            r#"{"action":"event","event":{"eventType":"seek","userName":"a","parameters":{"position":9}}}"#,
        );
        assert_eq!(h.store.room().events.len(), 2);
        assert!(!h.store.dismiss_event(5));
    }

    // ── Chat, announcements, errors ─────────────────────────────────

    #[tokio::test]
    async fn chat_appends_in_order() {
        let mut h = harness();
        h.store.on_message(r#"{"action":"chat","from":{"name":"a"},"text":"hi"}"#);
        h.store.on_message(r#"{"action":"chat","from":{"name":"b"},"text":"hi"}"#);
        let room = h.store.room();
        assert_eq!(room.chat_messages.len(), 2);
        assert_eq!(room.chat_messages[0].from.name, "a");
        assert_eq!(room.chat_messages[1].from.name, "b");
    }

    #[tokio::test]
    async fn announcement_and_error_are_forwarded() {
        let mut h = harness();
        h.store.on_message(r#"{"action":"announcement","text":"maintenance at 5"}"#);
        h.store.on_message(r#"{"action":"error","error":"not allowed"}"#);
        assert_eq!(
            drain(&mut h.events),
            vec![
                RoomClientEvent::Announcement {
                    text: "maintenance at 5".into()
                },
                RoomClientEvent::Error {
                    message: "not allowed".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn raw_message_recorded_even_when_unparseable() {
        let mut h = harness();
        h.store.on_message("{not json");
        assert_eq!(h.store.state().socket.message, "{not json");
        h.store.on_message(r#"{"action":"user","user":{}}"#);
        assert_eq!(h.store.state().socket.message, r#"{"action":"user","user":{}}"#);
        assert!(drain(&mut h.events).is_empty());
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[tokio::test]
    async fn open_resets_logs_and_starts_keep_alive() {
        let mut h = harness();
        h.store.chat(ChatMessage::default());
        h.store.event(seek_event(1.0));

        h.store.on_open();
        let state = h.store.state();
        assert!(state.socket.is_connected);
        assert!(state.join_failure_reason.is_none());
        assert!(state.room.chat_messages.is_empty());
        assert!(state.room.events.is_empty());
        assert!(h.store.keep_alive_active());

        h.store.on_close(None);
        assert!(!h.store.keep_alive_active());
    }

    #[tokio::test]
    async fn open_migrates_legacy_username() {
        let storage = Arc::new(MemoryStorage::new().with_entry(LEGACY_USERNAME_KEY, "dave"));
        let mut h = harness_with_storage(storage.clone());

        h.store.on_open();

        assert_eq!(h.store.state().username.as_deref(), Some("dave"));
        assert!(!storage.contains(LEGACY_USERNAME_KEY));
        assert_eq!(h.claimed.recv().await.as_deref(), Some("dave"));
    }

    #[tokio::test]
    async fn open_keeps_legacy_username_when_logged_in() {
        let storage = Arc::new(MemoryStorage::new().with_entry(LEGACY_USERNAME_KEY, "dave"));
        let mut h = harness_with_storage(storage.clone());
        h.store.login(AccountUser {
            username: "erin".into(),
            ..Default::default()
        });

        h.store.on_open();

        assert!(h.store.state().username.is_none());
        assert!(storage.contains(LEGACY_USERNAME_KEY));
    }

    #[tokio::test]
    async fn close_room_not_found_stops() {
        let mut h = harness();
        h.store.on_open();
        let disposition = h.store.on_close(Some(&CloseInfo {
            code: 4002,
            reason: String::new(),
        }));

        assert_eq!(disposition, CloseDisposition::Stop);
        assert_eq!(
            h.store.state().join_failure_reason.as_deref(),
            Some(ROOM_NOT_FOUND_REASON)
        );
        assert_eq!(
            drain(&mut h.events),
            vec![RoomClientEvent::RoomJoinFailure {
                reason: ROOM_NOT_FOUND_REASON.into()
            }]
        );

        // A later successful open clears the reason.
        h.store.on_open();
        assert!(h.store.state().join_failure_reason.is_none());
    }

    #[tokio::test]
    async fn ordinary_close_reconnects() {
        let mut h = harness();
        h.store.on_open();
        let disposition = h.store.on_close(Some(&CloseInfo {
            code: 1006,
            reason: String::new(),
        }));
        assert_eq!(disposition, CloseDisposition::Reconnect);
        assert!(!h.store.is_connected());
        assert!(h.store.state().join_failure_reason.is_none());
    }

    #[tokio::test]
    async fn reconnect_error_is_sticky() {
        let mut h = harness();
        h.store.on_reconnect(1);
        assert!(!h.store.state().socket.reconnect_error);
        h.store.on_reconnect_error();
        h.store.on_open();
        assert!(h.store.state().socket.reconnect_error);
    }

    // ── User actions ────────────────────────────────────────────────

    #[tokio::test]
    async fn status_is_sent_while_connected() {
        let mut h = harness();
        h.store.on_open();
        h.store.set_playback_status(PlayerStatus::Buffering).unwrap();

        assert_eq!(h.store.state().player_status, Some(PlayerStatus::Buffering));
        assert_eq!(
            h.outbound.try_recv().unwrap(),
            Outbound::Message(ClientMessage::Status {
                status: PlayerStatus::Buffering
            })
        );
    }

    #[tokio::test]
    async fn status_rejected_while_disconnected() {
        let mut h = harness();
        let err = h.store.set_playback_status(PlayerStatus::Ready).unwrap_err();
        assert!(matches!(err, OttError::NotConnected));
        assert_eq!(h.store.state().player_status, Some(PlayerStatus::Ready));
        assert!(h.outbound.try_recv().is_err());
        assert!(matches!(
            h.store.send_message("hello"),
            Err(OttError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn local_player_state_and_quick_add() {
        let mut h = harness();
        h.store.set_playback_buffer(0.5);
        h.store.set_playback_buffer_spans(vec![BufferSpan {
            start: 0.0,
            end: 12.0,
        }]);
        h.store.quick_add(Video {
            id: Some("abc".into()),
            ..Default::default()
        });
        h.store.quick_add(Video::default());

        let state = h.store.state();
        assert_eq!(state.player_buffer_percent, Some(0.5));
        assert_eq!(state.player_buffer_spans.as_ref().unwrap().len(), 1);
        assert_eq!(state.quick_add.len(), 2);

        h.store.clear_quick_add();
        assert!(h.store.state().quick_add.is_empty());
    }
}
