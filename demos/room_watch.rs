//! # Room Watch Example
//!
//! Joins a watch room and logs what happens in it:
//!
//! 1. Connect to the room socket (reconnecting after drops)
//! 2. Fetch role and permission metadata over HTTP
//! 3. Report the local player as ready
//! 4. Log playback changes, room events, chat and announcements
//! 5. Shut down gracefully on Ctrl+C or when the room does not exist
//!
//! ## Running
//!
//! ```sh
//! # Start a room server on localhost:3000, then:
//! cargo run --example room_watch
//!
//! # Override the endpoints:
//! OTT_URL=wss://example.com/api/room/movie-night \
//! OTT_API_URL=https://example.com/api \
//!     cargo run --example room_watch
//! ```

use std::sync::Arc;
use std::time::Duration;

use ott_client::protocol::PlayerStatus;
use ott_client::storage::JsonFileStorage;
use ott_client::{
    HttpApiClient, RoomClient, RoomClientConfig, RoomClientEvent, Services, WebSocketConnector,
};

/// Default room socket URL when `OTT_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:3000/api/room/test";

/// Default HTTP API base when `OTT_API_URL` is not set.
const DEFAULT_API_URL: &str = "http://localhost:3000/api";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("OTT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let api_url = std::env::var("OTT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    tracing::info!("Joining {url}");

    let connector = WebSocketConnector::new(url).with_connect_timeout(Duration::from_secs(10));
    let api = Arc::new(HttpApiClient::new(api_url)?);
    let services = Services::new(api).with_storage(Arc::new(JsonFileStorage::new(
        std::env::temp_dir().join("ott-client-demo.json"),
    )));
    let config = RoomClientConfig::default().with_max_reconnect_attempts(10);

    let (mut client, mut event_rx) = RoomClient::start(connector, config, services);

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    RoomClientEvent::Connected => {
                        tracing::info!("Connected to room");
                        if let Err(e) = client.update_permissions_metadata().await {
                            tracing::warn!("Could not load permissions: {e}");
                        }
                        if let Err(e) = client.set_playback_status(PlayerStatus::Ready).await {
                            tracing::warn!("Could not report status: {e}");
                        }
                    }
                    RoomClientEvent::Sync => {
                        let room = client.room().await;
                        tracing::info!(
                            title = %room.title,
                            users = room.users.len(),
                            queued = room.queue.len(),
                            "Room synced"
                        );
                    }
                    RoomClientEvent::PlayVideo => {
                        let room = client.room().await;
                        tracing::info!(
                            "Playing {} at {:.1}s",
                            room.current_source.title.as_deref().unwrap_or("(untitled)"),
                            room.playback_position
                        );
                    }
                    RoomClientEvent::PauseVideo => tracing::info!("Paused"),
                    RoomClientEvent::RoomEvent(event) => {
                        tracing::info!(
                            "{} by {}",
                            event.event_type,
                            event.user_name.as_deref().unwrap_or("someone")
                        );
                    }
                    RoomClientEvent::Announcement { text } => {
                        tracing::info!("Announcement: {text}");
                    }
                    RoomClientEvent::Error { message } => {
                        tracing::warn!("Server error: {message}");
                    }
                    RoomClientEvent::RoomJoinFailure { reason } => {
                        tracing::error!("Could not join room: {reason}");
                    }
                    RoomClientEvent::Disconnected { reason } => {
                        tracing::info!("Disconnected: {}", reason.as_deref().unwrap_or("unknown"));
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    let chat = client.room().await.chat_messages.len();
    tracing::info!("Saw {chat} chat messages");

    client.shutdown().await;
    Ok(())
}
