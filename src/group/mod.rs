//! Task group coordinator: scoped spawning, joined results, shared
//! cancellation, aggregated errors, retries.
//!
//! ```text
//!                 ┌────────────────────────────────────────────┐
//!                 │                 Group::scope               │
//!                 │  (retry driver, one Generation per attempt)│
//!                 └──────┬─────────────────────────────┬───────┘
//!                        │ body(ctx)                   │ finalize()
//!                        ▼                             ▼
//!  ┌──────────────────────────────┐     ┌──────────────────────────────┐
//!  │         GroupContext         │     │          Generation          │
//!  │ spawn / spawn_future /       │ ──▶ │ settled-record channel drain │
//!  │ spawn_task / supervise       │     │ abort-on-first-failure       │
//!  │ signal()                     │     │ close, supervisor teardown   │
//!  └──────────────────────────────┘     └──────────────────────────────┘
//! ```
//!
//! ## Rules
//! - The group resolves only after **every** blocking task settled; results
//!   come back in spawn (slot) order regardless of completion order.
//! - The first failure aborts the shared [`Signal`](crate::Signal); later
//!   failures join [`GroupError::more_errors`] in completion order.
//! - Supervisors are cancelled once blocking work drains; their failures
//!   still poison the group, their successes carry no result.
//! - A retrying group runs each attempt in a **fresh generation** with a
//!   fresh signal; nothing carries across attempts.
//! - A failure of the scope body itself is never retried and supersedes the
//!   generation's own outcome.
//!
//! ## Example
//! ```rust,no_run
//! use tasknest::{Group, GroupOptions, TaskError};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let results = Group::scope(GroupOptions::new(), |ctx| {
//!     let spawned = ctx
//!         .spawn(|_| async { Ok::<_, TaskError<u32>>(1) })
//!         .and_then(|_| ctx.spawn(|_| async { Ok(2) }));
//!     async move {
//!         spawned?;
//!         Ok(())
//!     }
//! })
//! .await?;
//! assert_eq!(results, vec![1, 2]);
//! # Ok(())
//! # }
//! ```

mod context;
mod generation;
mod options;

pub use context::{Execution, GroupContext, GuardFuture, Slot, Task, TaskFuture};
pub use options::GroupOptions;

use std::future::Future;

use crate::error::{GroupError, TaskError};
use crate::events::{Event, EventKind};
use crate::retry::RetryAttempt;

use generation::Generation;

/// Entry points for running task groups.
///
/// All constructors are tagged by what they accept:
/// [`scope`](Group::scope) takes a body driving spawns imperatively,
/// [`run`](Group::run)/[`run_all`](Group::run_all) take re-callable task
/// closures, [`run_future`](Group::run_future) takes a one-shot future.
pub struct Group;

impl Group {
    /// Runs a scoped task group.
    ///
    /// The body receives a [`GroupContext`] and spawns tasks through it; the
    /// group then waits for every blocking task and resolves with their
    /// values in spawn order, or with the aggregated [`GroupError`].
    ///
    /// With [`GroupOptions::with_retries`], a failed generation is torn down
    /// and the body is invoked again against a fresh one. The body must
    /// therefore be re-callable (`FnMut`); a failure of the body itself is
    /// surfaced immediately and never retried.
    pub async fn scope<T, F, Fut>(
        options: GroupOptions<T>,
        mut body: F,
    ) -> Result<Vec<T>, GroupError<T>>
    where
        T: Send + 'static,
        F: FnMut(GroupContext<T>) -> Fut,
        Fut: Future<Output = Result<(), TaskError<T>>>,
    {
        let mut attempt: u32 = 1;
        loop {
            let (generation, ctx) = Generation::new(&options);

            if let Err(error) = body(ctx).await {
                // The driving code itself failed: cancel everything already
                // spawned, wait it out, surface the body's error untouched.
                generation.abandon().await;
                return Err(GroupError::new(error));
            }

            let failure = match generation.finalize().await {
                Ok(results) => return Ok(results),
                Err(failure) => failure,
            };
            if attempt > options.retries {
                return Err(failure);
            }

            let remaining = options.retries - attempt + 1;
            if let Some(bus) = &options.bus {
                bus.publish(
                    Event::new(EventKind::RetryScheduled)
                        .with_attempt(attempt)
                        .with_remaining(remaining)
                        .with_reason(failure.error.to_string()),
                );
            }
            if let Some(hook) = &options.on_retry {
                if let Err(hook_error) = hook(RetryAttempt { attempt, remaining }).await {
                    return Err(GroupError::new(TaskError::fail(hook_error)));
                }
            }
            attempt += 1;
        }
    }

    /// Runs a single re-callable task and returns its value.
    ///
    /// Equivalent to a [`scope`](Group::scope) spawning exactly one task:
    /// the task participates in retries (a fresh future per attempt) and in
    /// cancellation-as-result (opting out resolves with the carried value).
    pub async fn run<T, F, Fut>(task: F, options: GroupOptions<T>) -> Result<T, GroupError<T>>
    where
        T: Send + 'static,
        F: Fn(GroupContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError<T>>> + Send + 'static,
    {
        let mut results = Self::run_all(vec![Task::call(task)], options).await?;
        Ok(results
            .pop()
            .expect("a one-task group resolves with exactly one result"))
    }

    /// Runs a batch of re-callable tasks; results come back in input order.
    pub async fn run_all<T>(
        tasks: Vec<Task<T>>,
        options: GroupOptions<T>,
    ) -> Result<Vec<T>, GroupError<T>>
    where
        T: Send + 'static,
    {
        Self::scope(options, |ctx| {
            let mut spawned = Ok(());
            for task in &tasks {
                if let Err(err) = ctx.spawn_task(task) {
                    spawned = Err(TaskError::from(err));
                    break;
                }
            }
            async move { spawned }
        })
        .await
    }

    /// Runs a one-shot future as a single-task group.
    ///
    /// A future cannot be re-created, so this always runs exactly one
    /// generation; `retries`/`on_retry` in `options` are ignored. Everything
    /// else applies — the future gets a slot, can be opted out of via
    /// cancellation-as-result, and failures surface as [`GroupError`].
    pub async fn run_future<T, Fut>(
        fut: Fut,
        options: GroupOptions<T>,
    ) -> Result<T, GroupError<T>>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, TaskError<T>>> + Send + 'static,
    {
        let (generation, ctx) = Generation::new(&options);
        if let Err(err) = ctx.spawn_future(fut) {
            generation.abandon().await;
            return Err(GroupError::new(TaskError::from(err)));
        }
        let mut results = generation.finalize().await?;
        Ok(results
            .pop()
            .expect("a one-task group resolves with exactly one result"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;
    use crate::error::{ClosedGroupError, TaskError};
    use crate::events::{Bus, EventKind};
    use crate::retry::retry_hook;

    fn fail<T>(msg: &str) -> TaskError<T> {
        TaskError::fail(msg.to_string())
    }

    #[tokio::test]
    async fn test_retries_exhausted_surface_the_original_error() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);

        let result: Result<u32, _> = Group::run(
            move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(fail("rejected!"))
                }
            },
            GroupOptions::new().with_retries(4),
        )
        .await;

        // retries = 4 means five attempts total.
        assert_eq!(runs.load(Ordering::SeqCst), 5);
        let err = result.unwrap_err();
        assert_eq!(err.error.to_string(), "rejected!");
        assert!(err.more_errors.is_empty());
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);

        let result = Group::run(
            move |ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    // Each attempt runs in a fresh generation.
                    assert!(!ctx.signal().is_aborted());
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(fail("flaky"))
                    } else {
                        Ok(7u32)
                    }
                }
            },
            GroupOptions::new().with_retries(2),
        )
        .await;

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_on_retry_hook_sees_attempt_and_remaining() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let hook = retry_hook(move |attempt| {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder
                    .lock()
                    .unwrap()
                    .push((attempt.attempt, attempt.remaining));
                Ok(())
            }
        });

        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let result = Group::run(
            move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 4 {
                        Err(fail("rejected!"))
                    } else {
                        Ok(9u32)
                    }
                }
            },
            GroupOptions::new().with_retries(4).with_on_retry(hook),
        )
        .await;

        assert_eq!(result.unwrap(), 9);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, 4), (2, 3), (3, 2), (4, 1)]
        );
    }

    #[tokio::test]
    async fn test_failing_hook_stops_retries_and_replaces_the_error() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let hook = retry_hook(|_attempt| async { Err("!!!".into()) });

        let result: Result<u32, _> = Group::run(
            move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(fail("rejected!"))
                }
            },
            GroupOptions::new().with_retries(4).with_on_retry(hook),
        )
        .await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().error.to_string(), "!!!");
    }

    #[tokio::test]
    async fn test_body_failure_is_not_retried() {
        let bodies = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&bodies);

        let result: Result<Vec<u32>, _> = Group::scope(
            GroupOptions::new().with_retries(4),
            move |_ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(fail("body rejected"))
                }
            },
        )
        .await;

        assert_eq!(bodies.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().error.to_string(), "body rejected");
    }

    #[tokio::test]
    async fn test_cancel_resolves_the_slot_without_failing_the_group() {
        let result = Group::run(
            |_ctx| async { Err(TaskError::cancel(42u32)) },
            GroupOptions::new(),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_run_all_keeps_input_order_and_mixes_cancel_with_success() {
        let tasks = vec![
            Task::call(|_ctx| async { Err(TaskError::cancel_with_message(42u32, "enough")) }),
            Task::call(|ctx: GroupContext<u32>| async move {
                assert!(!ctx.signal().is_aborted());
                Ok(43)
            }),
        ];

        let results = Group::run_all(tasks, GroupOptions::new()).await.unwrap();
        assert_eq!(results, vec![42, 43]);
    }

    #[tokio::test]
    async fn test_cancel_from_the_body_is_an_ordinary_failure() {
        let result: Result<Vec<u32>, _> = Group::scope(GroupOptions::new(), |_ctx| async {
            Err(TaskError::cancel(42u32))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.error.is_cancelled());
        assert!(err.more_errors.is_empty());
    }

    #[tokio::test]
    async fn test_max_concurrent_one_runs_tasks_in_spawn_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let results = Group::scope(
            GroupOptions::new().with_max_concurrent(1),
            |ctx| {
                let spawned = [(1u32, 20u64), (2, 10), (3, 5), (4, 30)]
                    .into_iter()
                    .try_for_each(|(id, delay)| {
                        let order = Arc::clone(&order);
                        ctx.spawn(move |_| async move {
                            order.lock().unwrap().push(id);
                            sleep(Duration::from_millis(delay)).await;
                            Ok(id)
                        })
                        .map(|_| ())
                    });
                async move { spawned.map_err(TaskError::from) }
            },
        )
        .await
        .unwrap();

        assert_eq!(results, vec![1, 2, 3, 4]);
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panicking_task_fails_the_group_after_siblings_drain() {
        let sibling_done = Arc::new(AtomicU32::new(0));

        let result: Result<Vec<u32>, _> = Group::scope(GroupOptions::new(), |ctx| {
            let done = Arc::clone(&sibling_done);
            let spawned = ctx
                .spawn(|_| async { panic!("kaboom") })
                .and_then(|_| {
                    ctx.spawn(move |_| async move {
                        sleep(Duration::from_millis(10)).await;
                        done.fetch_add(1, Ordering::SeqCst);
                        Ok(1)
                    })
                });
            async move {
                spawned?;
                Ok(())
            }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.error.to_string().contains("kaboom"));
        assert_eq!(sibling_done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_future_resolves_and_fails() {
        let ok = Group::run_future(async { Ok::<_, TaskError<u32>>(5) }, GroupOptions::new())
            .await
            .unwrap();
        assert_eq!(ok, 5);

        let err = Group::run_future(
            async { Err::<u32, _>(fail("rejected!")) },
            GroupOptions::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error.to_string(), "rejected!");
    }

    #[tokio::test]
    async fn test_spawn_after_close_fails_and_never_runs_the_body() {
        let stash: Arc<Mutex<Option<GroupContext<u32>>>> = Arc::new(Mutex::new(None));
        let keeper = Arc::clone(&stash);

        Group::scope(GroupOptions::new(), move |ctx| {
            *keeper.lock().unwrap() = Some(ctx);
            async { Ok(()) }
        })
        .await
        .unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let body_ran = Arc::clone(&ran);
        let ctx = stash.lock().unwrap().take().unwrap();
        let err = ctx
            .spawn(move |_| async move {
                body_ran.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            })
            .unwrap_err();

        assert_eq!(err, ClosedGroupError);
        sleep(Duration::from_millis(5)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bus_observes_the_lifecycle_in_sequence_order() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();

        let results = Group::scope(
            GroupOptions::new().with_bus(bus),
            |ctx| {
                let spawned = ctx.spawn(|_| async { Ok(1u32) }).map(|_| ());
                async move { spawned.map_err(TaskError::from) }
            },
        )
        .await
        .unwrap();
        assert_eq!(results, vec![1]);

        let mut kinds = Vec::new();
        let mut last_seq = None;
        while let Ok(ev) = rx.try_recv() {
            if let Some(prev) = last_seq {
                assert!(ev.seq > prev);
            }
            last_seq = Some(ev.seq);
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskSpawned,
                EventKind::TaskStopped,
                EventKind::GenerationClosed,
            ]
        );
    }
}
