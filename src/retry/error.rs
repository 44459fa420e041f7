//! Error types for polling operations.

use std::time::Duration;

/// Error returned when no attempt succeeded before the deadline.
///
/// Carries the error from the *last* attempt: earlier failures usually just
/// mean the system had not converged yet.
///
/// # Examples
///
/// ```rust
/// use eventually::{eventually_with, RetryPolicy, Verbosity};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let policy = RetryPolicy::new(Duration::from_millis(20))
///     .with_initial_delay(Duration::from_millis(1));
///
/// let result = eventually_with(
///     || async { Err::<(), _>("status still 503") },
///     &policy,
///     &Verbosity::quiet(),
/// )
/// .await;
///
/// let exceeded = result.unwrap_err();
/// assert_eq!(exceeded.last_error, "status still 503");
/// assert!(exceeded.to_string().contains("Timed Out"));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineExceeded<E> {
    /// The error from the final attempt.
    pub last_error: E,
    /// Total number of attempts made.
    pub attempts: u32,
    /// Time between the first attempt and the final failure.
    pub elapsed: Duration,
}

impl<E> DeadlineExceeded<E> {
    /// Create a new DeadlineExceeded error.
    pub fn new(last_error: E, attempts: u32, elapsed: Duration) -> Self {
        Self {
            last_error,
            attempts,
            elapsed,
        }
    }

    /// Extract the last error, discarding metadata.
    pub fn into_error(self) -> E {
        self.last_error
    }

    /// Get a reference to the last error.
    pub fn error(&self) -> &E {
        &self.last_error
    }
}

impl<E: std::fmt::Display> std::fmt::Display for DeadlineExceeded<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "** Timed Out (after {} seconds) -- Last error: '{}' **",
            self.elapsed.as_secs_f64(),
            self.last_error
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for DeadlineExceeded<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last_error)
    }
}

/// Error returned by cancellable polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventuallyError<E> {
    /// The time budget ran out.
    DeadlineExceeded(DeadlineExceeded<E>),
    /// The cancellation token fired before the deadline.
    Cancelled {
        /// Attempts completed before cancellation.
        attempts: u32,
        /// Time between the first attempt and cancellation.
        elapsed: Duration,
        /// The most recent failure, if any attempt ran.
        last_error: Option<E>,
    },
}

impl<E> EventuallyError<E> {
    /// Returns true if the deadline was reached.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_))
    }

    /// Returns true if polling was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The most recent attempt error, if any.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::DeadlineExceeded(e) => Some(&e.last_error),
            Self::Cancelled { last_error, .. } => last_error.as_ref(),
        }
    }

    /// Number of attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::DeadlineExceeded(e) => e.attempts,
            Self::Cancelled { attempts, .. } => *attempts,
        }
    }
}

impl<E> From<DeadlineExceeded<E>> for EventuallyError<E> {
    fn from(e: DeadlineExceeded<E>) -> Self {
        Self::DeadlineExceeded(e)
    }
}

impl<E: std::fmt::Display> std::fmt::Display for EventuallyError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeadlineExceeded(e) => write!(f, "{}", e),
            Self::Cancelled {
                elapsed,
                last_error: Some(last),
                ..
            } => write!(
                f,
                "** Cancelled (after {} seconds) -- Last error: '{}' **",
                elapsed.as_secs_f64(),
                last
            ),
            Self::Cancelled {
                elapsed,
                last_error: None,
                ..
            } => write!(
                f,
                "** Cancelled (after {} seconds) before any attempt **",
                elapsed.as_secs_f64()
            ),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for EventuallyError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DeadlineExceeded(e) => Some(&e.last_error),
            Self::Cancelled { last_error, .. } => last_error
                .as_ref()
                .map(|e| e as &(dyn std::error::Error + 'static)),
        }
    }
}
