//! # tasknest
//!
//! Structured concurrency for groups of Tokio tasks: scoped spawning, joined
//! results in spawn order, shared cancellation, aggregated errors, retries
//! with fresh state per attempt.
//!
//! ```text
//!  ┌─────────────────────────────────────────────────────────────────┐
//!  │                            Group                                │
//!  │        scope · run · run_all · run_future  (retry driver)       │
//!  └───────┬───────────────────────────────────────────────┬─────────┘
//!          │ one Generation per attempt                    │
//!          ▼                                               ▼
//!  ┌──────────────────────┐   settled records   ┌──────────────────────┐
//!  │     GroupContext     │ ──────────────────▶ │      coordinator     │
//!  │ spawn blocking tasks │                     │ join, first-failure  │
//!  │ supervise guards     │ ◀────────────────── │ abort, aggregation   │
//!  │ share one Signal     │      Signal         └──────────┬───────────┘
//!  └──────────────────────┘                                │ events
//!                                                          ▼
//!                                                 ┌──────────────────┐
//!                                                 │   Bus (optional) │
//!                                                 └──────────────────┘
//! ```
//!
//! ## Rules
//! - A group resolves only after **every** blocking task has settled; the
//!   result list follows spawn (slot) order, never completion order.
//! - The first failure aborts the group's [`Signal`]; every later failure
//!   joins [`GroupError::more_errors`] in completion order.
//! - A task can opt out via cancellation-as-result ([`TaskError::cancel`]):
//!   its slot resolves with the carried value and nothing else is disturbed.
//! - Supervisors ([`GroupContext::supervise`]) take no result slot and are
//!   cancelled once blocking work drains; their failures still poison the
//!   group.
//! - Retries run each attempt in a fresh generation — fresh signal, fresh
//!   slots, nothing shared with the failed attempt.
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use tasknest::{BackoffPolicy, Group, GroupOptions, TaskError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backoff = BackoffPolicy::Exponential {
//!         start: Duration::from_millis(100),
//!         factor: 2.0,
//!         max: Some(Duration::from_secs(5)),
//!     };
//!
//!     let results = Group::scope(
//!         GroupOptions::new()
//!             .with_retries(3)
//!             .with_on_retry(backoff.into_hook()),
//!         |ctx| {
//!             let spawned = ctx
//!                 .spawn(|_| async { Ok::<_, TaskError<String>>("a".into()) })
//!                 .and_then(|_| ctx.spawn(|_| async { Ok("b".into()) }));
//!             async move {
//!                 spawned?;
//!                 Ok(())
//!             }
//!         },
//!     )
//!     .await?;
//!
//!     assert_eq!(results, vec!["a".to_string(), "b".to_string()]);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature flags
//! - `logging` — [`events::LogWriter`], a stdout printer for bus events
//!   (demo/reference only).

pub mod error;
pub mod events;
pub mod group;
pub mod policies;
pub mod retry;
pub mod signal;
pub mod timeout;

pub use error::{
    BoxError, Cancelled, ClosedGroupError, GroupError, TaskError, TimeoutError,
};
pub use events::{Bus, Event, EventKind};
pub use group::{
    Execution, Group, GroupContext, GroupOptions, GuardFuture, Slot, Task, TaskFuture,
};
pub use policies::BackoffPolicy;
pub use retry::{retry_hook, OnRetry, RetryAttempt};
pub use signal::Signal;
pub use timeout::timeout_task;

#[cfg(feature = "logging")]
pub use events::LogWriter;
