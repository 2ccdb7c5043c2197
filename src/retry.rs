//! Retry hook types consumed by the group driver between generations.
//!
//! A retrying group runs one generation per attempt. Between a failed attempt
//! and the next one the driver invokes the configured [`OnRetry`] hook with a
//! [`RetryAttempt`]. The hook is asynchronous and fallible; a hook failure
//! stops retrying and **replaces** the original group error as the surfaced
//! failure (documented policy, see
//! [`GroupOptions::with_on_retry`](crate::GroupOptions::with_on_retry)).
//!
//! The backoff calculators in [`policies`](crate::policies) produce
//! sleep-then-resolve hooks of this shape.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::BoxError;

/// One failed attempt, as seen by the retry hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    /// Attempts left after this one, including the one about to start.
    pub remaining: u32,
}

/// Asynchronous hook invoked between retry attempts.
pub type OnRetry = Arc<dyn Fn(RetryAttempt) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Wraps a plain async closure into an [`OnRetry`] hook.
///
/// # Example
/// ```
/// use tasknest::retry::{retry_hook, RetryAttempt};
///
/// let hook = retry_hook(|attempt: RetryAttempt| async move {
///     println!("attempt {} failed, {} left", attempt.attempt, attempt.remaining);
///     Ok(())
/// });
/// ```
pub fn retry_hook<F, Fut>(hook: F) -> OnRetry
where
    F: Fn(RetryAttempt) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |attempt| hook(attempt).boxed())
}
