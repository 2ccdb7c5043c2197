//! Lifecycle events emitted by task groups.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata
//! (slot, attempt, reason). Each event has a globally unique sequence number
//! (`seq`) that increases monotonically — use it to restore order when events
//! are consumed late.
//!
//! ## Example
//! ```rust
//! use tasknest::events::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_slot(2)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.slot, Some(2));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of group lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A blocking task was spawned.
    ///
    /// Sets: `slot`.
    TaskSpawned,

    /// A supervisor (non-blocking) task was spawned.
    SupervisorSpawned,

    /// A task settled successfully.
    ///
    /// Sets: `slot` (blocking tasks only).
    TaskStopped,

    /// A task settled with a failure that joins the aggregated error.
    ///
    /// Sets: `slot` (blocking tasks only), `reason`.
    TaskFailed,

    /// A task opted out via cancellation-as-result; its slot resolves with
    /// the carried payload.
    ///
    /// Sets: `slot`.
    TaskOptedOut,

    /// The generation's cancellation signal was aborted (first failure, or
    /// supervisor teardown after blocking work drained).
    GroupAborted,

    /// The generation closed; further spawns fail loudly.
    GenerationClosed,

    /// A retry was scheduled after a failed generation.
    ///
    /// Sets: `attempt` (the attempt that failed), `remaining`, `reason`.
    RetryScheduled,
}

/// Group lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Result slot of the task, if applicable.
    pub slot: Option<u32>,
    /// 1-based retry attempt number, if applicable.
    pub attempt: Option<u32>,
    /// Retry attempts remaining, if applicable.
    pub remaining: Option<u32>,
    /// Human-readable reason (failure message, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            slot: None,
            attempt: None,
            remaining: None,
            reason: None,
        }
    }

    /// Attaches a result slot.
    #[inline]
    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches the remaining-attempts count.
    #[inline]
    pub fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining = Some(remaining);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_are_monotonic() {
        let a = Event::new(EventKind::TaskSpawned);
        let b = Event::new(EventKind::TaskStopped);
        let c = Event::new(EventKind::GenerationClosed);
        assert!(a.seq < b.seq);
        assert!(b.seq < c.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::RetryScheduled)
            .with_attempt(1)
            .with_remaining(4)
            .with_reason("rejected!");
        assert_eq!(ev.attempt, Some(1));
        assert_eq!(ev.remaining, Some(4));
        assert_eq!(ev.reason.as_deref(), Some("rejected!"));
        assert_eq!(ev.slot, None);
    }
}
