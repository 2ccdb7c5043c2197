//! Backoff delay calculators for retrying task groups.
//!
//! [`BackoffPolicy`] is a pure function of the attempt number — no state
//! feeds back between calls, so the delay for attempt `n` is always the same
//! regardless of how earlier sleeps resolved.
//!
//! Three shapes:
//! - [`BackoffPolicy::Constant`] — always `delta`;
//! - [`BackoffPolicy::Linear`] — `start + delta × (attempt − 1)`, capped;
//! - [`BackoffPolicy::Exponential`] — `start × factor^(attempt − 1)`, capped.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use tasknest::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::Exponential {
//!     start: Duration::from_millis(100),
//!     factor: 2.0,
//!     max: Some(Duration::from_secs(10)),
//! };
//!
//! // Attempt 1 — uses `start`
//! assert_eq!(backoff.delay(1), Duration::from_millis(100));
//! // Attempt 2 — 100ms × 2
//! assert_eq!(backoff.delay(2), Duration::from_millis(200));
//! // Attempt 11 — 100ms × 2^10 = 102_400ms → capped at 10s
//! assert_eq!(backoff.delay(11), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::retry::{retry_hook, OnRetry};

/// Pure attempt-number → delay calculator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackoffPolicy {
    /// The same delay before every retry.
    Constant {
        /// Delay applied between every pair of attempts.
        delta: Duration,
    },
    /// Delay grows by `delta` per attempt, starting at `start`.
    Linear {
        /// Delay before the first retry.
        start: Duration,
        /// Additional delay per subsequent retry.
        delta: Duration,
        /// Optional cap.
        max: Option<Duration>,
    },
    /// Delay multiplies by `factor` per attempt, starting at `start`.
    Exponential {
        /// Delay before the first retry.
        start: Duration,
        /// Multiplicative growth factor (`>= 1.0` recommended).
        factor: f64,
        /// Optional cap.
        max: Option<Duration>,
    },
}

impl BackoffPolicy {
    /// Computes the delay for the given attempt number (1-based).
    ///
    /// Attempt `0` is treated as attempt `1`. Overflowing or non-finite
    /// intermediate values clamp to the cap (or `Duration::MAX` when no cap
    /// is configured).
    pub fn delay(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        match *self {
            BackoffPolicy::Constant { delta } => delta,
            BackoffPolicy::Linear { start, delta, max } => {
                let ceiling = max.unwrap_or(Duration::MAX);
                let grown = delta
                    .checked_mul(step)
                    .and_then(|extra| start.checked_add(extra))
                    .unwrap_or(ceiling);
                grown.min(ceiling)
            }
            BackoffPolicy::Exponential { start, factor, max } => {
                let ceiling = max.unwrap_or(Duration::MAX);
                let exponent = step.min(i32::MAX as u32) as i32;
                let secs = start.as_secs_f64() * factor.powi(exponent);
                if !secs.is_finite() || secs < 0.0 || secs > ceiling.as_secs_f64() {
                    ceiling
                } else {
                    Duration::from_secs_f64(secs).min(ceiling)
                }
            }
        }
    }

    /// Packages the policy as an `on_retry` hook that sleeps the computed
    /// delay, then resolves.
    ///
    /// # Example
    /// ```rust
    /// use std::time::Duration;
    /// use tasknest::{BackoffPolicy, GroupOptions};
    ///
    /// let opts: GroupOptions<u32> = GroupOptions::new()
    ///     .with_retries(3)
    ///     .with_on_retry(BackoffPolicy::Constant { delta: Duration::from_millis(200) }.into_hook());
    /// ```
    pub fn into_hook(self) -> OnRetry {
        retry_hook(move |attempt| {
            let delay = self.delay(attempt.attempt);
            async move {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        })
    }
}
