//! Reconnection state machine.
//!
//! Pure logic, no I/O: the owning client feeds it disconnect notifications
//! and per-second ticks, and acts on the returned decisions. A reconnect
//! cycle allows a bounded number of immediate attempts; once the budget is
//! exhausted the machine waits out the cycle interval before the next
//! scheduler-driven attempt. A user-initiated close latches the machine shut.

/// Policy knobs for the reconnect machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether unexpected disconnects schedule retries at all
    pub auto_reconnect: bool,
    /// Immediate attempts allowed per cycle before backing off
    pub attempts_per_cycle: u32,
    /// Minimum wait between cycles, in milliseconds
    pub interval_ms: i64,
}

impl ReconnectPolicy {
    pub const fn new(auto_reconnect: bool) -> Self {
        Self {
            auto_reconnect,
            attempts_per_cycle: 1,
            interval_ms: 1_000,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

/// What the owner should do after feeding the machine an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReconnectDecision {
    /// Fire a reconnect attempt now
    Reconnect,
    /// A retry is pending; wait for a later tick
    Scheduled,
    /// Nothing to do
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Backoff { pending_since_ms: i64 },
    Closed,
}

/// Backoff state machine governing when a dropped connection is retried.
#[derive(Debug)]
pub struct ReconnectController {
    policy: ReconnectPolicy,
    phase: Phase,
    attempt_count: u32,
}

impl ReconnectController {
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Idle,
            attempt_count: 0,
        }
    }

    /// An unexpected disconnect was observed at `now_ms`.
    pub fn on_unexpected_close(&mut self, now_ms: i64) -> ReconnectDecision {
        if matches!(self.phase, Phase::Closed) || !self.policy.auto_reconnect {
            return ReconnectDecision::Ignore;
        }
        if matches!(self.phase, Phase::Backoff { .. }) {
            return ReconnectDecision::Scheduled;
        }
        if self.attempt_count < self.policy.attempts_per_cycle {
            self.attempt_count = self.attempt_count.saturating_add(1);
            ReconnectDecision::Reconnect
        } else {
            self.phase = Phase::Backoff {
                pending_since_ms: now_ms,
            };
            ReconnectDecision::Scheduled
        }
    }

    /// A scheduler tick arrived at `now_ms`.
    pub fn on_tick(&mut self, now_ms: i64) -> ReconnectDecision {
        match self.phase {
            Phase::Backoff { pending_since_ms }
                if now_ms.saturating_sub(pending_since_ms) >= self.policy.interval_ms =>
            {
                self.phase = Phase::Idle;
                self.attempt_count = 0;
                ReconnectDecision::Reconnect
            }
            _ => ReconnectDecision::Ignore,
        }
    }

    /// The transport connected successfully.
    pub fn on_connected(&mut self) {
        self.phase = Phase::Idle;
        self.attempt_count = 0;
    }

    /// The user closed the client; no further retries, ever.
    pub fn on_closed_by_user(&mut self) {
        self.phase = Phase::Closed;
        self.attempt_count = 0;
    }

    /// Whether a disconnect observed now would lead to a retry.
    ///
    /// Drives the `will_reconnect` flag on close notifications.
    pub const fn will_reconnect(&self) -> bool {
        self.policy.auto_reconnect && !matches!(self.phase, Phase::Closed)
    }

    pub const fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed)
    }
}
