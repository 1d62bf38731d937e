#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for the room client integration tests.
//!
//! Provides a scripted [`MockConnector`] handing out [`MockTransport`]s, a
//! [`MockApi`] that counts calls, and helpers for common server JSON.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use ott_client::permissions::PermissionsMetadata;
use ott_client::protocol::CloseInfo;
use ott_client::{ApiClient, Connector, OttError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// One scripted connection: inbound items and the close frame seen after them.
pub struct Session {
    pub incoming: Vec<Option<Result<String, OttError>>>,
    pub close: Option<CloseInfo>,
}

impl Session {
    /// A session that delivers `messages` and then stays open.
    pub fn open(messages: Vec<String>) -> Self {
        Self {
            incoming: messages.into_iter().map(|m| Some(Ok(m))).collect(),
            close: None,
        }
    }

    /// A session that delivers `messages` and then closes with `code`.
    pub fn closing(messages: Vec<String>, code: u16) -> Self {
        let mut incoming: Vec<_> = messages.into_iter().map(|m| Some(Ok(m))).collect();
        incoming.push(None);
        Self {
            incoming,
            close: Some(CloseInfo {
                code,
                reason: String::new(),
            }),
        }
    }

    /// A session whose transport fails after `messages`.
    pub fn failing(messages: Vec<String>) -> Self {
        let mut incoming: Vec<_> = messages.into_iter().map(|m| Some(Ok(m))).collect();
        incoming.push(Some(Err(OttError::TransportReceive("connection reset".into()))));
        Self {
            incoming,
            close: None,
        }
    }
}

/// A scripted transport. All sessions of one connector share `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, OttError>>>,
    close: Option<CloseInfo>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), OttError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, OttError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // Script exhausted: stay connected until shutdown.
            std::future::pending().await
        }
    }

    fn close_info(&self) -> Option<CloseInfo> {
        self.close.clone()
    }

    async fn close(&mut self) -> Result<(), OttError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Hands out one scripted session (or error) per `connect` call. Once the
/// script runs out, `connect` never completes.
pub struct MockConnector {
    script: StdMutex<VecDeque<Result<Session, OttError>>>,
    pub connects: Arc<AtomicUsize>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new(script: Vec<Result<Session, OttError>>) -> Self {
        Self {
            script: StdMutex::new(VecDeque::from(script)),
            connects: Arc::new(AtomicUsize::new(0)),
            sent: Arc::new(StdMutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sessions(sessions: Vec<Session>) -> Self {
        Self::new(sessions.into_iter().map(Ok).collect())
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self) -> Result<MockTransport, OttError> {
        let next = self.script.lock().unwrap().pop_front();
        let Some(next) = next else {
            return std::future::pending().await;
        };
        self.connects.fetch_add(1, Ordering::SeqCst);
        let session = next?;
        Ok(MockTransport {
            incoming: VecDeque::from(session.incoming),
            close: session.close,
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        })
    }
}

// ── MockApi ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockApi {
    pub claimed: StdMutex<Vec<String>>,
    pub permission_fetches: AtomicUsize,
}

#[async_trait]
impl ApiClient for MockApi {
    async fn claim_username(&self, username: &str) -> Result<(), OttError> {
        self.claimed.lock().unwrap().push(username.to_string());
        Ok(())
    }

    async fn fetch_permissions(&self) -> Result<PermissionsMetadata, OttError> {
        self.permission_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(serde_json::json!({
            "roles": [
                { "id": 0, "name": "unregistered", "display": "Unregistered User" },
                { "id": 4, "name": "owner", "display": "Owner" }
            ],
            "permissions": [
                { "name": "playback.play-pause", "mask": 1, "minRole": 0 }
            ]
        }))
        .unwrap())
    }
}

// ── JSON helper functions ───────────────────────────────────────────

/// A `sync` message carrying the full initial room state.
pub fn initial_sync_json() -> String {
    serde_json::json!({
        "action": "sync",
        "name": "movie-night",
        "title": "Movie Night",
        "description": "",
        "isTemporary": false,
        "queueMode": "manual",
        "currentSource": {
            "service": "youtube",
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "length": 212
        },
        "queue": [],
        "isPlaying": true,
        "playbackPosition": 42,
        "hasOwner": false,
        "grants": 4095,
        "users": [
            { "id": "a1", "name": "alice", "isLoggedIn": true, "role": 4, "isYou": false },
            { "id": "b2", "name": "Guest 17", "isLoggedIn": false, "role": 0, "isYou": true }
        ]
    })
    .to_string()
}

/// A partial `sync` message changing only `isPlaying`.
pub fn play_state_json(is_playing: bool) -> String {
    serde_json::json!({ "action": "sync", "isPlaying": is_playing }).to_string()
}

pub fn chat_json(from: &str, text: &str) -> String {
    serde_json::json!({
        "action": "chat",
        "from": { "name": from, "isLoggedIn": false },
        "text": text
    })
    .to_string()
}

pub fn seek_event_json(position: f64) -> String {
    serde_json::json!({
        "action": "event",
        "event": {
            "eventType": "seek",
            "userName": "alice",
            "parameters": { "position": position, "prevPosition": 0 }
        }
    })
    .to_string()
}

/// Every message the client sent, parsed as JSON.
pub fn sent_json(sent: &StdMutex<Vec<String>>) -> Vec<serde_json::Value> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|text| serde_json::from_str(text).unwrap())
        .collect()
}
