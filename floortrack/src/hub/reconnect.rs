//! Subscriber-side reconnection policy.
//!
//! When a subscriber loses its connection it retries with a
//! multiplicative backoff (base delay times the attempt number, capped
//! at three) for a bounded number of attempts, then surfaces a
//! persistent disconnected state instead of retrying forever. The policy
//! is pure so consumers drive the actual sleeping and dialing.

use std::time::Duration;

/// Multiplier cap: the delay stops growing after the third attempt.
const BACKOFF_FACTOR_CAP: u32 = 3;

/// Backoff parameters for a reconnecting subscriber.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first retry; later retries multiply this.
    pub base_delay: Duration,
    /// Attempts before giving up for good.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given retry attempt (1-based):
    /// `base_delay × min(attempt, 3)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.clamp(1, BACKOFF_FACTOR_CAP)
    }
}

/// What a subscriber should do after a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait `delay`, then retry (this is retry number `attempt`).
    Retry { attempt: u32, delay: Duration },
    /// Attempts exhausted; stay disconnected.
    GiveUp,
}

/// Connection state surfaced to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting { attempt: u32 },
    /// Terminal until the consumer explicitly resets.
    Disconnected,
}

/// Tracks reconnect attempts against a policy.
#[derive(Debug)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    attempt: u32,
    state: ConnectionState,
}

impl ReconnectState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            state: ConnectionState::Connected,
        }
    }

    /// Record a disconnect or connect error and decide the next step.
    pub fn on_disconnect(&mut self) -> ReconnectDecision {
        if self.state == ConnectionState::Disconnected {
            return ReconnectDecision::GiveUp;
        }
        self.attempt += 1;
        if self.attempt > self.policy.max_attempts {
            self.state = ConnectionState::Disconnected;
            return ReconnectDecision::GiveUp;
        }
        self.state = ConnectionState::Reconnecting {
            attempt: self.attempt,
        };
        ReconnectDecision::Retry {
            attempt: self.attempt,
            delay: self.policy.delay_for(self.attempt),
        }
    }

    /// Record a successful (re)connection, resetting the attempt counter.
    pub fn on_connected(&mut self) {
        self.attempt = 0;
        self.state = ConnectionState::Connected;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}
