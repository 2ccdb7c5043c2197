//! One-shot cancellation signal shared by every task in a generation.
//!
//! [`Signal`] is the only cross-task communication channel inside a group:
//! the coordinator aborts it on the first task failure, and every sibling can
//! observe the abort and short-circuit cooperatively.
//!
//! ## Rules
//! - The live → aborted transition is **irreversible** and **idempotent**.
//! - Callbacks registered with [`Signal::on_abort`] run **exactly once**, in
//!   registration order, at the moment of transition — or immediately when
//!   the signal is already aborted at registration time (no missed-wakeup
//!   race).
//! - A signal belongs to exactly one generation; retries get a fresh one.
//!
//! The awaitable half ([`Signal::aborted`]) is backed by
//! [`tokio_util::sync::CancellationToken`].
//!
//! ## Example
//! ```
//! use tasknest::Signal;
//!
//! let signal = Signal::new();
//! assert!(!signal.is_aborted());
//!
//! signal.on_abort(|| println!("stopping"));
//! signal.abort();
//! signal.abort(); // idempotent, callbacks already ran
//! assert!(signal.is_aborted());
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

type AbortCallback = Box<dyn FnOnce() + Send>;

/// Cloneable handle to a generation's one-shot abort flag.
///
/// All clones observe the same state. Write-once per generation; safe for
/// unsynchronized concurrent reads.
#[derive(Clone)]
pub struct Signal {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    callbacks: Mutex<Vec<AbortCallback>>,
}

impl Signal {
    /// Creates a live signal.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Marks the signal aborted and runs the registered callbacks once, in
    /// registration order. Further calls are no-ops.
    pub fn abort(&self) {
        let callbacks = {
            let mut guard = self.lock_callbacks();
            if self.inner.token.is_cancelled() {
                return;
            }
            // Cancel while holding the lock so a concurrent `on_abort` either
            // lands in this drain or observes the aborted state and runs
            // immediately.
            self.inner.token.cancel();
            std::mem::take(&mut *guard)
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Returns whether the signal has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Registers a callback to run at the abort transition.
    ///
    /// If the signal is already aborted the callback runs immediately, on the
    /// caller's stack.
    pub fn on_abort(&self, callback: impl FnOnce() + Send + 'static) {
        let immediate = {
            let mut guard = self.lock_callbacks();
            if self.inner.token.is_cancelled() {
                Some(callback)
            } else {
                guard.push(Box::new(callback));
                None
            }
        };
        if let Some(callback) = immediate {
            callback();
        }
    }

    /// Suspends until the signal is aborted. Resolves immediately when it
    /// already is.
    pub async fn aborted(&self) {
        self.inner.token.cancelled().await;
    }

    fn lock_callbacks(&self) -> MutexGuard<'_, Vec<AbortCallback>> {
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
