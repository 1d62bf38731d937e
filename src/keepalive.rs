//! Application-level keep-alive.
//!
//! The server drops sockets that stay silent too long, so while connected the
//! client sends `{"action":"ping"}` on a fixed period. At most one timer runs
//! at a time: starting a new one aborts the previous task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::outbox::Outbox;
use crate::protocol::ClientMessage;

/// Default period between pings.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_millis(25_000);

/// Shortest period accepted; `tokio::time::interval` rejects zero.
pub const MIN_KEEP_ALIVE_INTERVAL: Duration = Duration::from_millis(1);

/// Owner of the single keep-alive task.
#[derive(Debug)]
pub struct KeepAlive {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl KeepAlive {
    /// Periods below [`MIN_KEEP_ALIVE_INTERVAL`] are clamped to it.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_KEEP_ALIVE_INTERVAL),
            task: None,
        }
    }

    /// Cancel any running timer and start a new one pinging through `outbox`.
    ///
    /// The first ping goes out one full period after the call. Must be called
    /// from within a Tokio runtime.
    pub fn restart(&mut self, outbox: Outbox) {
        self.cancel();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if outbox.send(ClientMessage::Ping).is_err() {
                    debug!("keep-alive stopped: connection loop gone");
                    break;
                }
            }
        }));
    }

    /// Stop the running timer, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Returns `true` while a timer task is installed.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_ALIVE_INTERVAL)
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::outbox::Outbound;

    fn count_pings(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Outbound>) -> usize {
        let mut pings = 0;
        while let Ok(frame) = rx.try_recv() {
            if frame == Outbound::Message(ClientMessage::Ping) {
                pings += 1;
            }
        }
        pings
    }

    #[tokio::test(start_paused = true)]
    async fn pings_once_per_period() {
        let (outbox, mut rx) = Outbox::channel();
        let mut keep_alive = KeepAlive::default();
        keep_alive.restart(outbox);

        time::sleep(Duration::from_millis(24_999)).await;
        assert_eq!(count_pings(&mut rx), 0);

        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count_pings(&mut rx), 1);

        time::sleep(Duration::from_millis(25_000)).await;
        assert_eq!(count_pings(&mut rx), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_timer() {
        let (outbox, mut rx) = Outbox::channel();
        let mut keep_alive = KeepAlive::default();
        for _ in 0..3 {
            keep_alive.restart(outbox.clone());
        }
        assert!(keep_alive.is_active());

        time::sleep(Duration::from_millis(25_001)).await;
        assert_eq!(count_pings(&mut rx), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_clamped_and_still_pings() {
        let (outbox, mut rx) = Outbox::channel();
        let mut keep_alive = KeepAlive::new(Duration::ZERO);
        assert_eq!(keep_alive.period(), MIN_KEEP_ALIVE_INTERVAL);
        keep_alive.restart(outbox);

        time::sleep(Duration::from_millis(10)).await;
        assert!(keep_alive.is_active());
        assert!(count_pings(&mut rx) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_pinging() {
        let (outbox, mut rx) = Outbox::channel();
        let mut keep_alive = KeepAlive::new(Duration::from_secs(1));
        keep_alive.restart(outbox);
        keep_alive.cancel();
        assert!(!keep_alive.is_active());

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count_pings(&mut rx), 0);
    }
}
