//! Reconnection policy and exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Number of automatic attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Delay before the first attempt.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Calculate delay for the given attempt number.
    ///
    /// Attempt `n` waits `base_delay * 2^(n-1)`; attempt 0 is treated as 1.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay())
    }

    /// Check if attempt number `attempt` is allowed.
    #[must_use]
    pub const fn should_reconnect(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }

    /// Delays for every attempt the policy allows, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_attempts).map(|attempt| self.delay_for_attempt(attempt))
    }
}

/// Calculate reconnection delay using exponential backoff.
#[must_use]
pub fn calculate_backoff(attempt: u32, base_delay: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base_delay.saturating_mul(1u32 << exponent)
}
