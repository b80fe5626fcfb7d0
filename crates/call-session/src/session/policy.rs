//! Reconnect decision policy.
//!
//! Pure function: given the attempts consumed so far and the failure
//! cause, decide whether to retry after a delay or give up. The delay
//! is fixed rather than exponential — a deliberate simplicity choice
//! for a short-lived, user-attended session, where a predictable short
//! wait beats a growing one.

use crate::errors::CallError;
use std::time::Duration;

/// Outcome of a reconnect decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Schedule another connection attempt after the delay.
    RetryAfter(Duration),
    /// Stop retrying; the session is terminal.
    GiveUp,
}

/// Bounded fixed-delay reconnect policy.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Maximum automatic attempts per session.
    max_attempts: u32,
    /// Fixed delay before each retry.
    delay: Duration,
}

impl ReconnectPolicy {
    /// Create a policy with explicit bounds.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Decide whether to retry after a qualifying failure.
    ///
    /// `attempts` is the number of reconnect attempts already consumed.
    /// Non-retryable causes (recognized server defects) always give up
    /// regardless of the attempt budget.
    #[must_use]
    pub fn decide(&self, attempts: u32, cause: &CallError) -> ReconnectDecision {
        if !cause.is_retryable() {
            return ReconnectDecision::GiveUp;
        }

        if attempts < self.max_attempts {
            ReconnectDecision::RetryAfter(self.delay)
        } else {
            ReconnectDecision::GiveUp
        }
    }

    /// The fixed retry delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The attempt budget.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_MAX_RECONNECT_ATTEMPTS,
            Duration::from_millis(crate::config::DEFAULT_RECONNECT_DELAY_MS),
        )
    }
}
