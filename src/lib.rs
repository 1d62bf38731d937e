//! # ott-client
//!
//! Client-side state for a synchronized watch room.
//!
//! This crate mirrors the room state a server pushes over a socket (playback,
//! queue, users, chat, transient events) into a local store, and relays the
//! user's own actions back.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **Partial sync**: server updates are merged field by field into an immutable [`RoomSnapshot`]
//! - **Event coalescing**: back-to-back seeks collapse into one visible notification
//! - **Reconnecting**: non-fatal closes are retried; a missing room stops the client
//! - **WebSocket and HTTP built-in**: default `transport-websocket` and `http-reqwest` features

pub mod api;
pub mod client;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod keepalive;
pub mod outbox;
pub mod permissions;
pub mod protocol;
pub mod room;
pub mod storage;
pub mod store;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use api::ApiClient;
#[cfg(feature = "http-reqwest")]
pub use api::HttpApiClient;
pub use client::{RoomClient, RoomClientConfig, Services};
pub use error::OttError;
pub use event::RoomClientEvent;
pub use event_queue::RoomEvent;
pub use protocol::{ClientMessage, ServerMessage};
pub use room::RoomSnapshot;
pub use store::{RoomStore, StoreState};
pub use transport::{Connector, Transport};
#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
