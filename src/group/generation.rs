//! One generation of a task group: registry, signal, result buffer, and the
//! join/cancel/error-collection algorithm.
//!
//! A [`Generation`] is a fresh value per attempt — a retrying group builds a
//! brand-new one (new [`Signal`], empty registry) for every attempt, so no
//! state bleeds across retries.
//!
//! ## Join algorithm (`finalize`)
//! ```text
//! while observed blocking < spawned blocking:
//!   recv settled record from the completion channel
//!     ├─ blocking Ok(v)          → results[slot] = v
//!     ├─ blocking Cancelled(v)   → results[slot] = v   (no abort, no aggregation)
//!     ├─ blocking Err (first)    → primary error, signal.abort()
//!     ├─ blocking Err (later)    → more_errors.push(err)   (completion order)
//!     └─ supervisor Err          → aggregated like a blocking failure
//!
//! close the generation            (further spawns fail loudly)
//! signal.abort()                  (idempotent; cancels outstanding supervisors)
//! drain outstanding supervisors   (successes discarded, failures aggregated)
//!
//! resolve: aggregated error, or results in slot order
//! ```
//!
//! ## Rules
//! - Every blocking task settles **exactly once** before the generation
//!   resolves — win or lose, nothing is left unobserved.
//! - The drained check and the closed flip share one lock acquisition: a
//!   spawn racing the close either joins the drain or fails with
//!   [`ClosedGroupError`](crate::ClosedGroupError); its outcome is never
//!   silently dropped.
//! - The signal is aborted **before** the group's error can surface, so
//!   every still-running sibling observes cancellation first.
//! - "First failure" is completion order as observed on the channel, not
//!   spawn order; deterministic for a fixed arrival order.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::error::{GroupError, TaskError};
use crate::events::{Event, EventKind};
use crate::signal::Signal;

use super::context::{GroupContext, Settled, Shared, State};
use super::options::GroupOptions;

/// One attempt of a task group.
pub(crate) struct Generation<T> {
    shared: Arc<Shared<T>>,
    rx: mpsc::UnboundedReceiver<Settled<T>>,
}

impl<T: Send + 'static> Generation<T> {
    /// Builds a fresh generation and its spawn surface.
    pub(crate) fn new(options: &GroupOptions<T>) -> (Self, GroupContext<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            tx,
            signal: Signal::new(),
            execution: options.execution.clone(),
            bus: options.bus.clone(),
        });
        let ctx = GroupContext {
            shared: Arc::clone(&shared),
        };
        (Self { shared, rx }, ctx)
    }

    /// Runs the join algorithm: waits for every blocking task, aborts on the
    /// first failure, closes the generation, cancels and drains supervisors,
    /// then resolves with the ordered result list or the aggregated error.
    pub(crate) async fn finalize(mut self) -> Result<Vec<T>, GroupError<T>> {
        let mut results: Vec<Option<T>> = Vec::new();
        let mut failure: Option<GroupError<T>> = None;
        let mut seen_blocking = 0usize;
        let mut seen_supervisors = 0usize;

        // Drain blocking tasks. The drained check and the closed flip happen
        // under one lock acquisition, so a concurrent spawn either lands in
        // this drain (it incremented the count first) or observes the closed
        // state and fails loudly. The count is re-read every iteration
        // because tasks may spawn further siblings while we wait.
        loop {
            {
                let mut state = self.shared.lock_state();
                if state.blocking_spawned == seen_blocking {
                    state.closed = true;
                    break;
                }
            }
            let Some(settled) = self.rx.recv().await else {
                self.shared.lock_state().closed = true;
                break;
            };
            match settled {
                Settled::Blocking { slot, outcome } => {
                    seen_blocking += 1;
                    self.collect_blocking_outcome(&mut results, &mut failure, slot, outcome);
                }
                Settled::Supervisor { outcome } => {
                    seen_supervisors += 1;
                    self.collect_guard_outcome(&mut failure, outcome);
                }
            }
        }
        self.shared.publish(Event::new(EventKind::GenerationClosed));

        if self.pending_supervisors(seen_supervisors) > 0 {
            self.abort();
        }
        while self.pending_supervisors(seen_supervisors) > 0 {
            let Some(settled) = self.rx.recv().await else {
                break;
            };
            match settled {
                Settled::Supervisor { outcome } => {
                    seen_supervisors += 1;
                    self.collect_guard_outcome(&mut failure, outcome);
                }
                // No blocking task can register once closed, but a record
                // that was already in flight is still processed, not dropped.
                Settled::Blocking { slot, outcome } => {
                    self.collect_blocking_outcome(&mut results, &mut failure, slot, outcome);
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(results
                .into_iter()
                .map(|slot| slot.expect("every blocking slot settles exactly once"))
                .collect()),
        }
    }

    /// Aborts the signal and drains everything, discarding results. Used
    /// when the driving code itself failed and its error supersedes the
    /// generation's own outcome.
    pub(crate) async fn abandon(self) {
        self.abort();
        let _ = self.finalize().await;
    }

    fn collect_blocking_outcome(
        &self,
        results: &mut Vec<Option<T>>,
        failure: &mut Option<GroupError<T>>,
        slot: usize,
        outcome: Result<T, TaskError<T>>,
    ) {
        match outcome {
            Ok(value) => place(results, slot, value),
            Err(TaskError::Cancelled(cancel)) => {
                // Cancellation-as-result: the slot resolves with the carried
                // payload, nothing is aborted.
                place(results, slot, cancel.value);
            }
            Err(error) => self.collect_failure(failure, error),
        }
    }

    fn collect_failure(&self, failure: &mut Option<GroupError<T>>, error: TaskError<T>) {
        match failure {
            None => {
                // Abort before the error can surface, so every sibling
                // observes cancellation first.
                self.abort();
                *failure = Some(GroupError::new(error));
            }
            Some(aggregated) => aggregated.more_errors.push(error),
        }
    }

    fn collect_guard_outcome(
        &self,
        failure: &mut Option<GroupError<T>>,
        outcome: Result<(), TaskError<T>>,
    ) {
        match outcome {
            // A supervisor's success (or opt-out) carries no result.
            Ok(()) | Err(TaskError::Cancelled(_)) => {}
            Err(error) => self.collect_failure(failure, error),
        }
    }

    fn abort(&self) {
        if !self.shared.signal.is_aborted() {
            self.shared.publish(Event::new(EventKind::GroupAborted));
        }
        self.shared.signal.abort();
    }

    fn pending_supervisors(&self, seen: usize) -> usize {
        self.shared.lock_state().supervisors_spawned - seen
    }
}

fn place<T>(results: &mut Vec<Option<T>>, slot: usize, value: T) {
    if results.len() <= slot {
        results.resize_with(slot + 1, || None);
    }
    results[slot] = Some(value);
}
