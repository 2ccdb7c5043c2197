//! Configuration of a task group.
//!
//! [`GroupOptions`] collects everything a [`Group`](super::Group) run can be
//! tuned with:
//!
//! - `retries` + `on_retry` — how many extra generations to run after a
//!   failed one, and what to do between them (sleep, log, give up early);
//! - `execution` — a wrapper applied around every blocking task's future,
//!   e.g. the built-in semaphore limiter from
//!   [`with_max_concurrent`](GroupOptions::with_max_concurrent);
//! - `bus` — an optional [`Bus`] receiving lifecycle events.
//!
//! All builders are `with_*` and consume `self`; the default is zero retries,
//! unlimited concurrency, no bus.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::events::Bus;
use crate::retry::OnRetry;

use super::context::Execution;

/// Configuration for one group run.
pub struct GroupOptions<T> {
    pub(crate) retries: u32,
    pub(crate) on_retry: Option<OnRetry>,
    pub(crate) execution: Option<Execution<T>>,
    pub(crate) bus: Option<Bus>,
}

impl<T> GroupOptions<T> {
    /// Default options: no retries, unlimited concurrency, no bus.
    pub fn new() -> Self {
        Self {
            retries: 0,
            on_retry: None,
            execution: None,
            bus: None,
        }
    }

    /// Sets how many extra generations to run after a failed one.
    ///
    /// `retries = n` means up to `n + 1` attempts total. Only failures of
    /// spawned tasks are retried; a failure of the scope body itself is
    /// surfaced immediately.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Installs a hook invoked between a failed generation and the next one.
    ///
    /// The hook is asynchronous and fallible. If it fails, retrying stops
    /// and the hook's error replaces the generation's own failure as the
    /// surfaced error.
    pub fn with_on_retry(mut self, hook: OnRetry) -> Self {
        self.on_retry = Some(hook);
        self
    }

    /// Installs a wrapper applied around every blocking task's future.
    pub fn with_execution(mut self, execution: Execution<T>) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Attaches an event bus receiving group lifecycle events.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }
}

impl<T: Send + 'static> GroupOptions<T> {
    /// Limits how many blocking tasks run concurrently (clamped to ≥ 1).
    ///
    /// Tasks still spawn and take their result slot immediately; their
    /// bodies queue on a fair semaphore, so execution order follows spawn
    /// order when the limit is reached.
    pub fn with_max_concurrent(self, limit: usize) -> Self {
        let semaphore = Arc::new(Semaphore::new(limit.max(1)));
        self.with_execution(Arc::new(move |fut| -> super::TaskFuture<T> {
            let semaphore = Arc::clone(&semaphore);
            Box::pin(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => fut.await,
                    // The semaphore is never closed; run unthrottled if it
                    // somehow was.
                    Err(_closed) => fut.await,
                }
            })
        }))
    }
}

impl<T> Default for GroupOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for GroupOptions<T> {
    fn clone(&self) -> Self {
        Self {
            retries: self.retries,
            on_retry: self.on_retry.clone(),
            execution: self.execution.clone(),
            bus: self.bus.clone(),
        }
    }
}
