//! Injectable clock and per-second ticker.
//!
//! Each client holds a [`TimeSource`] reference instead of reaching for a
//! process-wide scheduler singleton: the clock feeds id generation and event
//! timestamps, and the tick subscription drives the reconnect machine. A
//! client unsubscribes by dropping its receiver at destroy.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Clock plus per-second tick subscription.
pub trait TimeSource: Send + Sync {
    /// Current time in milliseconds since the epoch.
    fn now_millis(&self) -> i64;

    /// Subscribe to the per-second tick stream; each tick carries the
    /// timestamp it fired at.
    fn ticks(&self) -> broadcast::Receiver<i64>;
}

/// Wall-clock time source backed by a spawned tokio interval.
///
/// Must be created inside a tokio runtime. Shared freely across client
/// instances; the broadcast task stops when the source is dropped.
pub struct SystemTimeSource {
    sender: broadcast::Sender<i64>,
    driver: JoinHandle<()>,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        let tick_sender = sender.clone();
        let driver = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            // Avoid accumulating ticks if the task is delayed
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now_ms = Utc::now().timestamp_millis();
                tracing::trace!(now_ms, "scheduler tick");
                // Send fails only while nobody is subscribed
                let _ = tick_sender.send(now_ms);
            }
        });
        Self { sender, driver }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SystemTimeSource {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn ticks(&self) -> broadcast::Receiver<i64> {
        self.sender.subscribe()
    }
}

/// Deterministic time source for tests and simulations.
///
/// Time only moves when [`advance`](Self::advance) is called, and ticks only
/// fire through [`tick`](Self::tick).
pub struct ManualTimeSource {
    now_ms: AtomicI64,
    sender: broadcast::Sender<i64>,
}

impl ManualTimeSource {
    pub fn new(start_ms: i64) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            now_ms: AtomicI64::new(start_ms),
            sender,
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Fire one scheduler tick at the current time.
    pub fn tick(&self) {
        let _ = self.sender.send(self.now_millis());
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn ticks(&self) -> broadcast::Receiver<i64> {
        self.sender.subscribe()
    }
}
