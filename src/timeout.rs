//! Timeout guard for task groups.
//!
//! [`timeout_task`] builds a supervisor body that races the group's
//! cancellation signal against a deadline:
//!
//! - blocking work drains first → the signal aborts, the guard resolves
//!   quietly;
//! - the deadline elapses first → the guard fails with [`TimeoutError`],
//!   which aborts the group and surfaces through the normal aggregation
//!   path.
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use tasknest::{timeout_task, Group, GroupOptions, TaskError};
//!
//! # async fn demo() {
//! let result = Group::scope(GroupOptions::new(), |ctx| {
//!     let spawned = ctx
//!         .supervise(timeout_task(Duration::from_secs(5), Some("db-warmup")))
//!         .and_then(|_| {
//!             ctx.spawn(|_| async { Ok::<_, TaskError<u32>>(1) }).map(|_| ())
//!         });
//!     async move { spawned.map_err(TaskError::from) }
//! })
//! .await;
//! # let _ = result;
//! # }
//! ```

use std::time::Duration;

use crate::error::TimeoutError;
use crate::group::{GroupContext, GuardFuture};

/// Builds a supervisor body failing with [`TimeoutError`] after `duration`.
///
/// Pass the result to [`GroupContext::supervise`]. The optional `name` is
/// carried into the error for diagnostics.
pub fn timeout_task<T: Send + 'static>(
    duration: Duration,
    name: Option<&str>,
) -> impl FnOnce(GroupContext<T>) -> GuardFuture<T> {
    let name = name.map(str::to_owned);
    move |ctx| {
        Box::pin(async move {
            let signal = ctx.signal();
            if signal.is_aborted() {
                return Ok(());
            }
            tokio::select! {
                _ = signal.aborted() => Ok(()),
                _ = tokio::time::sleep(duration) => {
                    Err(TimeoutError::new(duration, name).into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use tokio::time::sleep;

    use super::*;
    use crate::error::TaskError;
    use crate::group::{Group, GroupOptions};

    #[tokio::test]
    async fn test_timeout_fires_and_cancels_the_slower_task() {
        let observed = Arc::new(AtomicBool::new(false));

        let result: Result<Vec<u32>, _> = Group::scope(GroupOptions::new(), |ctx| {
            let seen = Arc::clone(&observed);
            let spawned = ctx
                .supervise(timeout_task(Duration::from_millis(5), Some("lalala")))
                .and_then(|_| {
                    ctx.spawn(move |ctx| async move {
                        let signal = ctx.signal();
                        tokio::select! {
                            _ = signal.aborted() => {
                                seen.store(true, Ordering::SeqCst);
                                Err(TaskError::cancel(0))
                            }
                            _ = sleep(Duration::from_secs(5)) => Ok(1),
                        }
                    })
                    .map(|_| ())
                });
            async move { spawned.map_err(TaskError::from) }
        })
        .await;

        let err = result.unwrap_err();
        match &err.error {
            TaskError::Timeout(timeout) => {
                assert_eq!(timeout.duration, Duration::from_millis(5));
                assert_eq!(timeout.name.as_deref(), Some("lalala"));
            }
            other => panic!("expected a timeout, got: {other}"),
        }
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_timeout_stays_quiet_when_work_finishes_first() {
        let results = Group::scope(GroupOptions::new(), |ctx| {
            let spawned = ctx
                .supervise(timeout_task(Duration::from_secs(5), None))
                .and_then(|_| {
                    ctx.spawn(|_| async {
                        sleep(Duration::from_millis(5)).await;
                        Ok(1u32)
                    })
                    .map(|_| ())
                });
            async move { spawned.map_err(TaskError::from) }
        })
        .await
        .unwrap();

        assert_eq!(results, vec![1]);
    }
}
