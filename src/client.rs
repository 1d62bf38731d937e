//! Async client for a synchronized watch room.
//!
//! [`RoomClient`] is a thin handle over a shared [`RoomStore`] and a background
//! connection loop. The loop opens the socket through a [`Connector`], feeds
//! inbound messages to the store, writes queued outbound frames, and reconnects
//! after non-fatal closes. Notifications are emitted on a bounded channel
//! returned from [`RoomClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let connector = WebSocketConnector::new("wss://example.com/api/room/movie-night");
//! let api = Arc::new(HttpApiClient::new("https://example.com/api")?);
//! let (mut client, mut events) =
//!     RoomClient::start(connector, RoomClientConfig::default(), Services::new(api));
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         RoomClientEvent::PlayVideo => { /* … */ }
//!         RoomClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, error, warn};

use crate::api::ApiClient;
use crate::error::{OttError, Result};
use crate::event::{EventSink, RoomClientEvent};
use crate::keepalive::{DEFAULT_KEEP_ALIVE_INTERVAL, MIN_KEEP_ALIVE_INTERVAL};
use crate::outbox::{Outbound, Outbox};
use crate::permissions::{self, PermissionsCache};
use crate::protocol::{CloseInfo, PlayerStatus, Video};
use crate::room::RoomSnapshot;
use crate::storage::{LegacyStorage, NoStorage};
use crate::store::{AccountUser, BufferSpan, CloseDisposition, RoomStore, StoreState};
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default wait before each reconnection attempt.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`RoomClient`].
///
/// # Example
///
/// ```
/// use ott_client::client::RoomClientConfig;
/// use std::time::Duration;
///
/// let config = RoomClientConfig::default()
///     .with_keep_alive_interval(Duration::from_secs(10))
///     .with_max_reconnect_attempts(5);
/// assert_eq!(config.max_reconnect_attempts, Some(5));
/// assert!(config.reconnect);
/// ```
#[derive(Debug, Clone)]
pub struct RoomClientConfig {
    /// Period of the keep-alive ping while connected.
    ///
    /// Defaults to **25 seconds**. Values below 1 ms are clamped to 1 ms.
    pub keep_alive_interval: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up, events are dropped (with a warning
    /// logged). The final `Disconnected` event is always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Whether to reconnect after a non-fatal close or a failed connect.
    ///
    /// Defaults to **true**.
    pub reconnect: bool,
    /// Wait before each reconnection attempt.
    ///
    /// Defaults to **1 second**.
    pub reconnect_delay: Duration,
    /// Consecutive reconnection attempts before giving up. `None` retries
    /// forever.
    ///
    /// Defaults to **`None`**.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for RoomClientConfig {
    fn default() -> Self {
        Self {
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            reconnect: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: None,
        }
    }
}

impl RoomClientConfig {
    /// Values below 1 ms are clamped to 1 ms.
    #[must_use]
    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval.max(MIN_KEEP_ALIVE_INTERVAL);
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }
}

/// Reconnection settings handed to the connection loop.
#[derive(Debug, Clone, Copy)]
struct ReconnectPolicy {
    enabled: bool,
    delay: Duration,
    max_attempts: Option<u32>,
}

impl From<&RoomClientConfig> for ReconnectPolicy {
    fn from(config: &RoomClientConfig) -> Self {
        Self {
            enabled: config.reconnect,
            delay: config.reconnect_delay,
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

// ── Services ────────────────────────────────────────────────────────

/// Collaborators the client calls besides the socket.
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn ApiClient>,
    pub storage: Arc<dyn LegacyStorage>,
}

impl Services {
    /// Use `api` and no legacy storage.
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            api,
            storage: Arc::new(NoStorage),
        }
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn LegacyStorage>) -> Self {
        self.storage = storage;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async handle to a watch room.
///
/// Created via [`RoomClient::start`], which spawns the background connection
/// loop and returns this handle together with an event receiver.
pub struct RoomClient {
    store: Arc<Mutex<RoomStore>>,
    permissions: Arc<Mutex<PermissionsCache>>,
    api: Arc<dyn ApiClient>,
    sink: EventSink,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl RoomClient {
    /// Start the connection loop and return a handle plus event receiver.
    ///
    /// The loop connects immediately. The event receiver yields
    /// [`RoomClientEvent`]s until the loop exits; the last one is always
    /// [`Disconnected`](RoomClientEvent::Disconnected).
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<C: Connector>(
        connector: C,
        config: RoomClientConfig,
        services: Services,
    ) -> (Self, mpsc::Receiver<RoomClientEvent>) {
        let (outbox, outbound_rx) = Outbox::channel();
        let (sink, event_rx, _revision_rx) = EventSink::channel(config.event_channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let store = Arc::new(Mutex::new(RoomStore::new(
            outbox,
            sink.clone(),
            config.keep_alive_interval,
            Arc::clone(&services.api),
            services.storage,
        )));

        let task = tokio::spawn(connection_loop(
            connector,
            Arc::clone(&store),
            outbound_rx,
            sink.clone(),
            ReconnectPolicy::from(&config),
            shutdown_rx,
        ));

        let client = Self {
            store,
            permissions: Arc::new(Mutex::new(PermissionsCache::new())),
            api: services.api,
            sink,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Record the local player status and report it to the server.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::NotConnected`] while the socket is down.
    pub async fn set_playback_status(&self, status: PlayerStatus) -> Result<()> {
        self.store.lock().await.set_playback_status(status)
    }

    /// Record how much of the current video is buffered (`0.0..=1.0`).
    pub async fn set_playback_buffer(&self, percent: f64) {
        self.store.lock().await.set_playback_buffer(percent);
    }

    /// Record the buffered time ranges of the current video.
    pub async fn set_playback_buffer_spans(&self, spans: Vec<BufferSpan>) {
        self.store.lock().await.set_playback_buffer_spans(spans);
    }

    /// Send raw text on the socket.
    ///
    /// # Errors
    ///
    /// Returns [`OttError::NotConnected`] while the socket is down.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<()> {
        self.store.lock().await.send_message(text)
    }

    pub async fn login(&self, user: AccountUser) {
        self.store.lock().await.login(user);
    }

    pub async fn logout(&self) {
        self.store.lock().await.logout();
    }

    pub async fn quick_add(&self, video: Video) {
        self.store.lock().await.quick_add(video);
    }

    pub async fn clear_quick_add(&self) {
        self.store.lock().await.clear_quick_add();
    }

    /// Hide the room event at `index`. Returns `false` if there is none.
    pub async fn dismiss_event(&self, index: usize) -> bool {
        self.store.lock().await.dismiss_event(index)
    }

    /// Fetch role and permission metadata unless it has been fetched already.
    ///
    /// # Errors
    ///
    /// Propagates the HTTP error; a later call retries.
    pub async fn update_permissions_metadata(&self) -> Result<()> {
        let was_loaded = self.permissions.lock().await.is_loaded();
        permissions::ensure_loaded(&self.permissions, self.api.as_ref()).await?;
        if !was_loaded {
            self.sink.changed();
        }
        Ok(())
    }

    /// Shut down the client, closing the socket and stopping the background task.
    pub async fn shutdown(&mut self) {
        debug!("RoomClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the loop with a timeout; abort it if it does not exit in time.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection loop aborted: {join_err}");
                    }
                    self.store.lock().await.on_close(None);
                }
            }
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` while the socket is open.
    pub async fn is_connected(&self) -> bool {
        self.store.lock().await.is_connected()
    }

    /// A copy of the full store state.
    pub async fn state(&self) -> StoreState {
        self.store.lock().await.state().clone()
    }

    /// The current room snapshot.
    pub async fn room(&self) -> Arc<RoomSnapshot> {
        self.store.lock().await.room()
    }

    /// A copy of the permissions metadata cache.
    pub async fn permissions(&self) -> PermissionsCache {
        self.permissions.lock().await.clone()
    }

    /// Receiver whose value changes after every state mutation.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.sink.subscribe()
    }
}

impl std::fmt::Debug for RoomClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomClient")
            .field("has_task", &self.task.is_some())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Drop for RoomClient {
    fn drop(&mut self) {
        // No executor context for a graceful close here; abort the loop.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Connection loop ─────────────────────────────────────────────────

/// How a single connected session ended.
enum SessionEnd {
    /// Shutdown was requested.
    Shutdown,
    /// The server closed the socket.
    Closed(Option<CloseInfo>),
    /// The transport failed.
    Failed(OttError),
}

/// Background loop: connect, run the session, reconnect while allowed.
///
/// Exits when shutdown is requested, the server closes fatally, reconnection
/// is disabled, or reconnection attempts are exhausted.
async fn connection_loop<C: Connector>(
    connector: C,
    store: Arc<Mutex<RoomStore>>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    sink: EventSink,
    policy: ReconnectPolicy,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("connection loop started");
    let mut reconnect_count: u32 = 0;

    let reason = loop {
        let connected = tokio::select! {
            result = connector.connect() => result,
            _ = &mut shutdown_rx => break Some("client shut down".to_string()),
        };

        let mut last_reason = None;
        match connected {
            Ok(mut transport) => {
                reconnect_count = 0;
                discard_stale_frames(&mut outbound_rx);
                store.lock().await.on_open();
                sink.emit(RoomClientEvent::Connected);

                match run_session(&mut transport, &store, &mut outbound_rx, &mut shutdown_rx).await
                {
                    SessionEnd::Shutdown => {
                        let _ = transport.close().await;
                        store.lock().await.on_close(None);
                        break Some("client shut down".to_string());
                    }
                    SessionEnd::Closed(close) => {
                        let disposition = store.lock().await.on_close(close.as_ref());
                        let close_reason = close
                            .as_ref()
                            .map(|c| format!("closed by server ({}): {}", c.code, c.reason));
                        if disposition == CloseDisposition::Stop {
                            break close_reason;
                        }
                        last_reason = close_reason;
                    }
                    SessionEnd::Failed(err) => {
                        let mut store = store.lock().await;
                        store.on_error(&err);
                        store.on_close(None);
                        last_reason = Some(err.to_string());
                    }
                }
            }
            Err(err) => {
                store.lock().await.on_error(&err);
                last_reason = Some(err.to_string());
            }
        }

        if !policy.enabled {
            break last_reason;
        }
        let attempt = reconnect_count.saturating_add(1);
        if policy.max_attempts.is_some_and(|max| attempt > max) {
            store.lock().await.on_reconnect_error();
            break Some("reconnection attempts exhausted".to_string());
        }
        tokio::select! {
            _ = tokio::time::sleep(policy.delay) => {}
            _ = &mut shutdown_rx => break Some("client shut down".to_string()),
        }
        reconnect_count = attempt;
        store.lock().await.on_reconnect(attempt);
    };

    sink.emit_reliable(RoomClientEvent::Disconnected { reason }).await;
    debug!("connection loop exited");
}

/// Drop frames queued for a previous connection so they never reach a new one.
fn discard_stale_frames(outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>) {
    let mut discarded = 0usize;
    while outbound_rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "dropped frames queued before reconnect");
    }
}

/// Multiplex outbound frames, shutdown and inbound text over one transport.
async fn run_session<T: Transport>(
    transport: &mut T,
    store: &Mutex<RoomStore>,
    outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let text = match frame {
                    Some(Outbound::Message(msg)) => match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("failed to serialize ClientMessage: {e}");
                            continue;
                        }
                    },
                    Some(Outbound::Raw(text)) => text,
                    // Every outbox is gone; nothing can talk to us anymore.
                    None => return SessionEnd::Shutdown,
                };
                if let Err(e) = transport.send(text).await {
                    error!("transport send error: {e}");
                    return SessionEnd::Failed(e);
                }
            }

            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received");
                return SessionEnd::Shutdown;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => store.lock().await.on_message(&text),
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        return SessionEnd::Failed(e);
                    }
                    None => {
                        debug!("transport closed by server");
                        return SessionEnd::Closed(transport.close_info());
                    }
                }
            }
        }
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
    use crate::permissions::PermissionsMetadata;
    use crate::protocol::ClientMessage;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct NullApi;

    #[async_trait]
    impl ApiClient for NullApi {
        async fn claim_username(&self, _username: &str) -> Result<()> {
            Ok(())
        }

        async fn fetch_permissions(&self) -> Result<PermissionsMetadata> {
            Ok(PermissionsMetadata::default())
        }
    }

    /// Records sent frames and stays open until shut down.
    struct IdleTransport {
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for IdleTransport {
        async fn send(&mut self, message: String) -> Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            std::future::pending().await
        }

        fn close_info(&self) -> Option<CloseInfo> {
            None
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct IdleConnector {
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Connector for IdleConnector {
        type Transport = IdleTransport;

        async fn connect(&self) -> Result<IdleTransport> {
            Ok(IdleTransport {
                sent: Arc::clone(&self.sent),
            })
        }
    }

    #[tokio::test]
    async fn frames_queued_before_open_are_not_sent() {
        let (outbox, outbound_rx) = Outbox::channel();
        let (sink, mut events, _revision) = EventSink::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let store = Arc::new(Mutex::new(RoomStore::new(
            outbox.clone(),
            sink.clone(),
            DEFAULT_KEEP_ALIVE_INTERVAL,
            Arc::new(NullApi),
            Arc::new(NoStorage),
        )));

        // Left over from a connection that has since closed.
        outbox.send(ClientMessage::Ping).unwrap();
        outbox.send_raw("stale").unwrap();

        let sent = Arc::new(StdMutex::new(Vec::new()));
        let task = tokio::spawn(connection_loop(
            IdleConnector {
                sent: Arc::clone(&sent),
            },
            Arc::clone(&store),
            outbound_rx,
            sink,
            ReconnectPolicy::from(&RoomClientConfig::default()),
            shutdown_rx,
        ));

        assert_eq!(events.recv().await, Some(RoomClientEvent::Connected));
        outbox.send_raw("fresh").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sent.lock().unwrap().as_slice(), ["fresh".to_string()]);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(RoomClientEvent::Disconnected {
                reason: Some("client shut down".into())
            })
        );
    }

    #[test]
    fn config_defaults() {
        let config = RoomClientConfig::default();
        assert_eq!(config.keep_alive_interval, Duration::from_millis(25_000));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert!(config.reconnect);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert!(config.max_reconnect_attempts.is_none());
    }

    #[test]
    fn config_builder_methods() {
        let config = RoomClientConfig::default()
            .with_keep_alive_interval(Duration::ZERO)
            .with_event_channel_capacity(0)
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_reconnect(false)
            .with_reconnect_delay(Duration::from_millis(10))
            .with_max_reconnect_attempts(3);
        assert_eq!(config.keep_alive_interval, Duration::from_millis(1));
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert!(!config.reconnect);

        let policy = ReconnectPolicy::from(&config);
        assert!(!policy.enabled);
        assert_eq!(policy.delay, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, Some(3));
    }
}
