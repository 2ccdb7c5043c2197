//! Error types used by task groups and the tasks they run.
//!
//! Two layers:
//!
//! - Concrete leaf errors — [`TimeoutError`], [`ClosedGroupError`] and the
//!   cancellation-as-result payload [`Cancelled`].
//! - Aggregates — [`TaskError`] (everything a single task can fail with) and
//!   [`GroupError`] (the one failure a whole generation surfaces, carrying
//!   every secondary failure in [`GroupError::more_errors`]).
//!
//! [`TaskError`], [`GroupError`] and [`Cancelled`] are generic over the task
//! payload `T` and implement `Debug`/`Display`/`Error` by hand so `T` never
//! needs to be `Debug` (the same pattern as `tokio::sync::mpsc::error::SendError`).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error type for user task failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A timeout guard's deadline elapsed before the group finished.
///
/// Raised by [`timeout_task`](crate::timeout::timeout_task) and aggregated
/// like any other task failure.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tasknest::TimeoutError;
///
/// let err = TimeoutError::new(Duration::from_millis(5), Some("db".to_string()));
/// assert_eq!(err.code(), TimeoutError::CODE);
/// assert_eq!(err.to_string(), "timeout of 5ms occurred for task db");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("timeout of {}ms occurred for task {}", duration.as_millis(), name.as_deref().unwrap_or("<unknown-task>"))]
pub struct TimeoutError {
    /// The deadline that elapsed.
    pub duration: Duration,
    /// Optional name given to the guard, for diagnostics.
    pub name: Option<String>,
}

impl TimeoutError {
    /// Stable error code for logs/metrics.
    pub const CODE: &'static str = "ERR_GROUP_TIMEOUT";

    /// Creates a new timeout error.
    pub fn new(duration: Duration, name: Option<String>) -> Self {
        Self { duration, name }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        Self::CODE
    }
}

/// Spawning was attempted after the generation finalized.
///
/// Raised synchronously at spawn time; the task body never runs. Never
/// retried and never part of the aggregation path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("cannot spawn into a task group after it has closed")]
pub struct ClosedGroupError;

/// Cancellation-as-result payload: a task opting out of the group's normal
/// success path while still contributing a value to the result list.
///
/// Raising `TaskError::Cancelled` from a spawned task resolves that task's
/// slot with [`Cancelled::value`]. It does not abort the group's signal, does
/// not join the aggregated error, and does not count as a failure for retry
/// purposes. Raised from the scope body itself it propagates as an ordinary
/// failure.
pub struct Cancelled<T> {
    /// The value the task's slot resolves with.
    pub value: T,
    /// Optional human-readable message.
    pub message: Option<String>,
}

impl<T> Cancelled<T> {
    /// Stable error code for logs/metrics.
    pub const CODE: &'static str = "ERR_GROUP_TASK_CANCELLED";

    /// Creates a new cancellation payload.
    pub fn new(value: T) -> Self {
        Self {
            value,
            message: None,
        }
    }

    /// Attaches a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        Self::CODE
    }
}

impl<T> fmt::Debug for Cancelled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancelled")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Cancelled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}"),
            None => write!(f, "task cancelled with a result"),
        }
    }
}

impl<T> std::error::Error for Cancelled<T> {}

/// Everything a single task in a group can fail with.
pub enum TaskError<T> {
    /// An ordinary task failure.
    Fail(BoxError),
    /// A timeout guard's deadline elapsed.
    Timeout(TimeoutError),
    /// Cancellation-as-result: the coordinator converts this into a success
    /// carrying the payload. See [`Cancelled`].
    Cancelled(Cancelled<T>),
    /// A spawn was attempted after the generation closed.
    Closed(ClosedGroupError),
}

impl<T> TaskError<T> {
    /// Wraps an ordinary failure.
    pub fn fail(error: impl Into<BoxError>) -> Self {
        TaskError::Fail(error.into())
    }

    /// Opts out of the group's success path with `value`. See [`Cancelled`].
    pub fn cancel(value: T) -> Self {
        TaskError::Cancelled(Cancelled::new(value))
    }

    /// Opts out with a value and a message.
    pub fn cancel_with_message(value: T, message: impl Into<String>) -> Self {
        TaskError::Cancelled(Cancelled::new(value).with_message(message))
    }

    /// Returns true for the cancellation-as-result variant.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled(_))
    }
}

impl<T> From<TimeoutError> for TaskError<T> {
    fn from(err: TimeoutError) -> Self {
        TaskError::Timeout(err)
    }
}

impl<T> From<ClosedGroupError> for TaskError<T> {
    fn from(err: ClosedGroupError) -> Self {
        TaskError::Closed(err)
    }
}

impl<T> fmt::Debug for TaskError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Fail(err) => f.debug_tuple("Fail").field(err).finish(),
            TaskError::Timeout(err) => f.debug_tuple("Timeout").field(err).finish(),
            TaskError::Cancelled(err) => f.debug_tuple("Cancelled").field(err).finish(),
            TaskError::Closed(err) => f.debug_tuple("Closed").field(err).finish(),
        }
    }
}

impl<T> fmt::Display for TaskError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Fail(err) => write!(f, "{err}"),
            TaskError::Timeout(err) => write!(f, "{err}"),
            TaskError::Cancelled(err) => write!(f, "{err}"),
            TaskError::Closed(err) => write!(f, "{err}"),
        }
    }
}

impl<T> std::error::Error for TaskError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Fail(err) => Some(err.as_ref()),
            TaskError::Timeout(err) => Some(err),
            TaskError::Cancelled(_) => None,
            TaskError::Closed(err) => Some(err),
        }
    }
}

/// The single propagated failure of a generation.
///
/// [`GroupError::error`] is the first task failure in completion order;
/// [`GroupError::more_errors`] holds every subsequent failure from the same
/// generation, also in completion order. The list is empty unless at least
/// two tasks failed.
pub struct GroupError<T> {
    /// The first failure, by completion order.
    pub error: TaskError<T>,
    /// Every other failure observed in the same generation, in completion order.
    pub more_errors: Vec<TaskError<T>>,
}

impl<T> GroupError<T> {
    /// Wraps a primary failure with no secondary failures.
    pub fn new(error: TaskError<T>) -> Self {
        Self {
            error,
            more_errors: Vec::new(),
        }
    }

    /// Discards the secondary list and returns the primary failure.
    pub fn into_error(self) -> TaskError<T> {
        self.error
    }
}

impl<T> fmt::Debug for GroupError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupError")
            .field("error", &self.error)
            .field("more_errors", &self.more_errors)
            .finish()
    }
}

impl<T> fmt::Display for GroupError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.more_errors.len() {
            0 => write!(f, "{}", self.error),
            1 => write!(f, "{} (and 1 more task failure)", self.error),
            n => write!(f, "{} (and {n} more task failures)", self.error),
        }
    }
}

impl<T: 'static> std::error::Error for GroupError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_includes_name_and_millis() {
        let named = TimeoutError::new(Duration::from_millis(10), Some("lalala".into()));
        assert_eq!(named.to_string(), "timeout of 10ms occurred for task lalala");

        let anonymous = TimeoutError::new(Duration::from_millis(10), None);
        assert_eq!(
            anonymous.to_string(),
            "timeout of 10ms occurred for task <unknown-task>"
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(TimeoutError::CODE, "ERR_GROUP_TIMEOUT");
        assert_eq!(Cancelled::<u32>::CODE, "ERR_GROUP_TASK_CANCELLED");
    }

    #[test]
    fn test_cancelled_debug_hides_payload() {
        struct Opaque;
        let cancelled = Cancelled::new(Opaque).with_message("short-circuit");
        let rendered = format!("{cancelled:?}");
        assert!(rendered.contains("short-circuit"));
    }

    #[test]
    fn test_group_error_display_counts_secondary_failures() {
        let mut err: GroupError<u32> = GroupError::new(TaskError::fail("rejected!"));
        assert_eq!(err.to_string(), "rejected!");

        err.more_errors.push(TaskError::fail("rejected again"));
        assert_eq!(err.to_string(), "rejected! (and 1 more task failure)");

        err.more_errors.push(TaskError::fail("and again"));
        assert_eq!(err.to_string(), "rejected! (and 2 more task failures)");
    }

    #[test]
    fn test_closed_error_is_synchronous_usage_error() {
        let err: TaskError<u32> = ClosedGroupError.into();
        assert_eq!(
            err.to_string(),
            "cannot spawn into a task group after it has closed"
        );
    }
}
