//! Retry policy for fetching the API key.
//!
//! A [`RetryPolicy`] bounds the number of attempts and a [`Backoff`] decides
//! how long to wait after each failed one.  Delays are a pure function of the
//! attempt index so they can be tested without sleeping.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of key attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between key attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1000);

/// How long to wait after a failed attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Backoff {
    /// The same delay after every failure.
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },

    /// `delay_ms * attempt`.
    Linear {
        /// Base delay in milliseconds.
        delay_ms: u64,
    },

    /// `base_ms * 2^(attempt - 1)`, never more than `max_ms`.
    Exponential {
        /// Delay after the first failure, in milliseconds.
        base_ms: u64,
        /// Upper bound in milliseconds.
        max_ms: u64,
    },
}

impl Backoff {
    /// A fixed delay.
    pub fn fixed(delay: Duration) -> Self {
        Backoff::Fixed {
            delay_ms: duration_to_ms(delay),
        }
    }

    /// A linearly growing delay.
    pub fn linear(delay: Duration) -> Self {
        Backoff::Linear {
            delay_ms: duration_to_ms(delay),
        }
    }

    /// A doubling delay, capped at `max`.
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Backoff::Exponential {
            base_ms: duration_to_ms(base),
            max_ms: duration_to_ms(max),
        }
    }

    /// Delay to wait after `attempt` (1-based) failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let ms = match *self {
            Backoff::Fixed { delay_ms } => delay_ms,
            Backoff::Linear { delay_ms } => delay_ms.saturating_mul(u64::from(attempt)),
            Backoff::Exponential { base_ms, max_ms } => {
                let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
                base_ms.saturating_mul(factor).min(max_ms)
            }
        };
        Duration::from_millis(ms)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::fixed(DEFAULT_BACKOFF)
    }
}

/// Bounded retry: at most `max_attempts` tries, waiting per `backoff` in between.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy.  `max_attempts` must be at least one.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::config(
                "at least one attempt is required",
                Some("max_attempts".to_string()),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    /// `max_attempts` tries with a fixed delay in between.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Result<Self> {
        Self::new(max_attempts, Backoff::fixed(delay))
    }

    /// Maximum number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The backoff strategy.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay after `attempt` failed, or `None` when it was the last attempt.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts {
            Some(self.backoff.delay(attempt))
        } else {
            None
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
        }
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
