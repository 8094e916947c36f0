//! Client counters for observability.
//!
//! All counters use atomic operations and are safe to read from any thread.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters exposed by a client instance.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// Total event-submission requests dispatched
    pub sends_total: AtomicU64,
    /// Total event-submission requests that failed
    pub send_failures_total: AtomicU64,
    /// Total events carried by dispatched payloads
    pub events_sent_total: AtomicU64,
    /// Total malformed batch entries dropped during assembly
    pub events_dropped_total: AtomicU64,
    /// Total reconnect attempts fired by the controller
    pub reconnect_attempts_total: AtomicU64,
    /// Total errors recorded (transport, protocol, dispatch)
    pub errors_recorded_total: AtomicU64,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&self, events: u64) {
        self.sends_total.fetch_add(1, Ordering::Relaxed);
        self.events_sent_total.fetch_add(events, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, dropped: u64) {
        self.events_dropped_total.fetch_add(dropped, Ordering::Relaxed);
    }

    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_recorded_total.fetch_add(1, Ordering::Relaxed);
    }
}
