//! The spawn surface handed to every task and to the scope body.
//!
//! [`GroupContext`] is a cloneable handle into one generation of a task
//! group. It exposes:
//! - [`GroupContext::spawn`] / [`GroupContext::spawn_future`] — blocking
//!   tasks; the group waits for them and their values fill the result list
//!   in spawn (slot) order;
//! - [`GroupContext::supervise`] — supervisor tasks; cancelled once blocking
//!   work drains, their failures still poison the group but their successes
//!   carry no result;
//! - [`GroupContext::signal`] — the generation's cancellation [`Signal`].
//!
//! Every spawned task runs inside a reporting wrapper that catches panics,
//! publishes terminal events, and posts a settled record onto the
//! generation's completion channel. The coordinator never polls task handles
//! directly — it drains that channel (the join algorithm lives in
//! `generation.rs`).

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::{ClosedGroupError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::signal::Signal;

/// Boxed future of a blocking task: produces a value for its result slot.
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T, TaskError<T>>> + Send>>;

/// Boxed future of a supervisor task: produces no result, only a possible
/// failure.
pub type GuardFuture<T> = Pin<Box<dyn Future<Output = Result<(), TaskError<T>>> + Send>>;

/// Wrapper applied around each blocking task's future (default identity).
///
/// Lets callers inject their own concurrency limiter; see
/// [`GroupOptions::with_max_concurrent`](super::GroupOptions::with_max_concurrent).
pub type Execution<T> = Arc<dyn Fn(TaskFuture<T>) -> TaskFuture<T> + Send + Sync>;

/// Stable index of a blocking task's result in the group's output list.
///
/// Assigned in spawn order; the task's eventual value lands at this position
/// regardless of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub(crate) usize);

impl Slot {
    /// Returns the position in the result list.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A re-callable task for [`Group::run`](super::Group::run) and
/// [`Group::run_all`](super::Group::run_all).
///
/// Wraps an `Fn` closure that creates a fresh future per invocation, so a
/// retrying group can re-run the same task in every generation (one future
/// per attempt, no shared mutable state).
pub struct Task<T> {
    run: Arc<dyn Fn(GroupContext<T>) -> TaskFuture<T> + Send + Sync>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a task from a closure receiving the group context.
    ///
    /// # Example
    /// ```
    /// use tasknest::{Task, TaskError};
    ///
    /// let task: Task<u32> = Task::call(|_ctx| async { Ok::<_, TaskError<u32>>(4) });
    /// ```
    pub fn call<F, Fut>(task: F) -> Self
    where
        F: Fn(GroupContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError<T>>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |ctx| Box::pin(task(ctx))),
        }
    }

    pub(crate) fn start(&self, ctx: GroupContext<T>) -> TaskFuture<T> {
        (self.run)(ctx)
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

/// Settled record posted by every task's reporting wrapper.
pub(crate) enum Settled<T> {
    Blocking {
        slot: usize,
        outcome: Result<T, TaskError<T>>,
    },
    Supervisor {
        outcome: Result<(), TaskError<T>>,
    },
}

/// Mutable bookkeeping of one generation, touched only under the lock.
#[derive(Default)]
pub(crate) struct State {
    pub(crate) closed: bool,
    pub(crate) blocking_spawned: usize,
    pub(crate) supervisors_spawned: usize,
}

/// State shared between the coordinator and every context clone of one
/// generation.
pub(crate) struct Shared<T> {
    pub(crate) state: Mutex<State>,
    pub(crate) tx: mpsc::UnboundedSender<Settled<T>>,
    pub(crate) signal: Signal,
    pub(crate) execution: Option<Execution<T>>,
    pub(crate) bus: Option<Bus>,
}

impl<T> Shared<T> {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(ev);
        }
    }
}

/// Cloneable handle into one generation of a task group.
///
/// All clones refer to the same generation; clones stashed beyond the
/// group's lifetime keep working as spawn surfaces but fail with
/// [`ClosedGroupError`] once the generation finalized.
pub struct GroupContext<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for GroupContext<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> GroupContext<T> {
    /// Spawns a blocking task from a closure receiving a context clone.
    ///
    /// The task starts running immediately and the call returns without
    /// waiting. Its eventual value (or cancellation-as-result payload) lands
    /// at the returned [`Slot`] of the group's result list.
    ///
    /// Fails with [`ClosedGroupError`] once the generation finalized; the
    /// closure is never invoked in that case.
    pub fn spawn<F, Fut>(&self, task: F) -> Result<Slot, ClosedGroupError>
    where
        F: FnOnce(GroupContext<T>) -> Fut,
        Fut: Future<Output = Result<T, TaskError<T>>> + Send + 'static,
    {
        let slot = self.register_blocking()?;
        self.start_blocking(slot, Box::pin(task(self.clone())));
        Ok(Slot(slot))
    }

    /// Spawns a ready-made future as a blocking task.
    pub fn spawn_future<Fut>(&self, fut: Fut) -> Result<Slot, ClosedGroupError>
    where
        Fut: Future<Output = Result<T, TaskError<T>>> + Send + 'static,
    {
        let slot = self.register_blocking()?;
        self.start_blocking(slot, Box::pin(fut));
        Ok(Slot(slot))
    }

    /// Spawns a re-callable [`Task`] as a blocking task.
    pub fn spawn_task(&self, task: &Task<T>) -> Result<Slot, ClosedGroupError> {
        let slot = self.register_blocking()?;
        self.start_blocking(slot, task.start(self.clone()));
        Ok(Slot(slot))
    }

    /// Spawns a supervisor (non-blocking) task.
    ///
    /// The group does not wait for supervisors: once every blocking task has
    /// settled, the signal is aborted and outstanding supervisors are
    /// drained. A supervisor's failure still poisons the group through the
    /// normal aggregation path; its success carries no result.
    pub fn supervise<F, Fut>(&self, guard: F) -> Result<(), ClosedGroupError>
    where
        F: FnOnce(GroupContext<T>) -> Fut,
        Fut: Future<Output = Result<(), TaskError<T>>> + Send + 'static,
    {
        {
            let mut state = self.shared.lock_state();
            if state.closed {
                return Err(ClosedGroupError);
            }
            state.supervisors_spawned += 1;
        }
        self.shared.publish(Event::new(EventKind::SupervisorSpawned));

        let fut: GuardFuture<T> = Box::pin(guard(self.clone()));
        let shared = Arc::clone(&self.shared);
        tokio::spawn(report_supervisor(shared, fut));
        Ok(())
    }

    /// Returns the generation's cancellation signal.
    ///
    /// The signal doubles as the abort controller: any task may call
    /// [`Signal::abort`] to cancel its siblings without failing the group.
    pub fn signal(&self) -> Signal {
        self.shared.signal.clone()
    }

    fn register_blocking(&self) -> Result<usize, ClosedGroupError> {
        let mut state = self.shared.lock_state();
        if state.closed {
            return Err(ClosedGroupError);
        }
        let slot = state.blocking_spawned;
        state.blocking_spawned += 1;
        Ok(slot)
    }

    fn start_blocking(&self, slot: usize, fut: TaskFuture<T>) {
        let fut = match &self.shared.execution {
            Some(wrap) => wrap(fut),
            None => fut,
        };
        self.shared
            .publish(Event::new(EventKind::TaskSpawned).with_slot(slot as u32));
        let shared = Arc::clone(&self.shared);
        tokio::spawn(report_blocking(shared, slot, fut));
    }
}

/// Runs one blocking task to completion and posts its settled record.
///
/// Panics are caught and reported as ordinary failures so the drain
/// invariant (every blocking slot settles exactly once) holds.
async fn report_blocking<T: Send + 'static>(
    shared: Arc<Shared<T>>,
    slot: usize,
    fut: TaskFuture<T>,
) {
    let outcome = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(TaskError::fail(panic_reason(panic))),
    };
    match &outcome {
        Ok(_) => shared.publish(Event::new(EventKind::TaskStopped).with_slot(slot as u32)),
        Err(TaskError::Cancelled(_)) => {
            shared.publish(Event::new(EventKind::TaskOptedOut).with_slot(slot as u32));
        }
        Err(err) => shared.publish(
            Event::new(EventKind::TaskFailed)
                .with_slot(slot as u32)
                .with_reason(err.to_string()),
        ),
    }
    let _ = shared.tx.send(Settled::Blocking { slot, outcome });
}

async fn report_supervisor<T: Send + 'static>(shared: Arc<Shared<T>>, fut: GuardFuture<T>) {
    let outcome = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(TaskError::fail(panic_reason(panic))),
    };
    match &outcome {
        Ok(()) | Err(TaskError::Cancelled(_)) => {
            shared.publish(Event::new(EventKind::TaskStopped));
        }
        Err(err) => {
            shared.publish(Event::new(EventKind::TaskFailed).with_reason(err.to_string()));
        }
    }
    let _ = shared.tx.send(Settled::Supervisor { outcome });
}

fn panic_reason(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_string()
    }
}
