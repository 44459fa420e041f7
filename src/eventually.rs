//! Async executors that poll a check until it passes.
//!
//! Each call builds fresh futures from the `check` factory, so attempts never
//! overlap: attempt N+1 starts only after attempt N has settled. The only
//! suspension points are the check itself and the backoff sleep between
//! failures.
//!
//! Time is measured with [`tokio::time::Instant`], so tests can drive these
//! executors under a paused tokio clock.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::logging::Verbosity;
use crate::retry::{DeadlineExceeded, EventuallyError, RetryEvent, RetryPolicy};

/// Poll `check` with the default policy and environment-derived verbosity.
///
/// Defaults: 120 second budget, 100ms initial delay, `[0, 10ms)` jitter.
///
/// # Example
///
/// ```rust
/// use eventually::eventually;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// # tokio_test::block_on(async {
/// let polls = AtomicU32::new(0);
///
/// let status = eventually(|| async {
///     match polls.fetch_add(1, Ordering::SeqCst) {
///         0 => Err("503 Service Unavailable"),
///         _ => Ok(200),
///     }
/// })
/// .await
/// .unwrap();
///
/// assert_eq!(status, 200);
/// assert_eq!(polls.load(Ordering::SeqCst), 2);
/// # });
/// ```
pub async fn eventually<T, E, F, Fut>(check: F) -> Result<T, DeadlineExceeded<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    eventually_with(check, &RetryPolicy::default(), &Verbosity::from_env()).await
}

/// Poll `check` under an explicit policy and verbosity.
///
/// Failed attempts are reported through `verbosity`; the final deadline
/// failure is reported at `warn` when verbosity is enabled.
pub async fn eventually_with<T, E, F, Fut>(
    check: F,
    policy: &RetryPolicy,
    verbosity: &Verbosity,
) -> Result<T, DeadlineExceeded<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let result = eventually_with_hooks(check, policy, |event: &RetryEvent<'_, E>| {
        verbosity.log_retry(event)
    })
    .await;

    if let Err(exceeded) = &result {
        verbosity.log_timeout(exceeded, exceeded.attempts, exceeded.elapsed);
    }
    result
}

/// Poll `check`, invoking `on_retry` after every failed attempt.
///
/// The hook is synchronous and runs before the backoff sleep. On the
/// attempt that exhausts the budget it receives `next_delay: None`.
///
/// # Example
///
/// ```rust
/// use eventually::{eventually_with_hooks, RetryEvent, RetryPolicy};
/// use std::sync::Mutex;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let seen = Mutex::new(Vec::new());
/// let policy = RetryPolicy::new(Duration::from_millis(30))
///     .with_initial_delay(Duration::from_millis(1));
///
/// let result = eventually_with_hooks(
///     || async { Err::<(), _>("route not found") },
///     &policy,
///     |event: &RetryEvent<'_, &str>| seen.lock().unwrap().push(event.attempt),
/// )
/// .await;
///
/// let attempts = result.unwrap_err().attempts;
/// let seen = seen.into_inner().unwrap();
/// assert_eq!(seen.len() as u32, attempts);
/// assert_eq!(seen.first(), Some(&1));
/// # });
/// ```
pub async fn eventually_with_hooks<T, E, F, Fut, H>(
    check: F,
    policy: &RetryPolicy,
    on_retry: H,
) -> Result<T, DeadlineExceeded<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: Fn(&RetryEvent<'_, E>),
{
    match poll(check, policy, on_retry, &Uninterrupted).await {
        Ok(value) => Ok(value),
        Err(Halt::Deadline(exceeded)) => Err(exceeded),
        Err(Halt::Interrupted { signal, .. }) => match signal {},
    }
}

/// Poll `check` until it passes, the deadline elapses, or `cancel` fires.
///
/// Cancellation is checked before each attempt and raced against each
/// backoff sleep. A check that is already running is awaited to completion.
///
/// # Example
///
/// ```rust
/// use eventually::{eventually_with_cancel, RetryPolicy, Verbosity};
/// use eventually::CancellationToken;
///
/// # tokio_test::block_on(async {
/// let token = CancellationToken::new();
/// token.cancel();
///
/// let result = eventually_with_cancel(
///     || async { Ok::<_, String>(1) },
///     &RetryPolicy::default(),
///     &Verbosity::quiet(),
///     &token,
/// )
/// .await;
///
/// assert!(result.unwrap_err().is_cancelled());
/// # });
/// ```
pub async fn eventually_with_cancel<T, E, F, Fut>(
    check: F,
    policy: &RetryPolicy,
    verbosity: &Verbosity,
    cancel: &CancellationToken,
) -> Result<T, EventuallyError<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let result = poll(
        check,
        policy,
        |event: &RetryEvent<'_, E>| verbosity.log_retry(event),
        cancel,
    )
    .await
    .map_err(|halt| match halt {
        Halt::Deadline(exceeded) => EventuallyError::DeadlineExceeded(exceeded),
        Halt::Interrupted {
            signal: (),
            attempts,
            elapsed,
            last_error,
        } => EventuallyError::Cancelled {
            attempts,
            elapsed,
            last_error,
        },
    });

    match &result {
        Err(EventuallyError::DeadlineExceeded(exceeded)) => {
            verbosity.log_timeout(exceeded, exceeded.attempts, exceeded.elapsed);
        }
        Err(EventuallyError::Cancelled {
            attempts, elapsed, ..
        }) => {
            tracing::debug!(
                context = verbosity.context().unwrap_or("-"),
                attempts,
                elapsed_secs = elapsed.as_secs_f64(),
                "polling cancelled"
            );
        }
        Ok(_) => {}
    }
    result
}

/// Something that can cut a polling loop short.
trait Interrupt {
    /// Carried out of the loop when interrupted.
    type Signal;

    /// Checked before every attempt.
    fn interrupted(&self) -> Option<Self::Signal>;

    /// Wait out a backoff delay, returning early if interrupted.
    async fn sleep(&self, delay: Duration) -> Option<Self::Signal>;
}

/// Never interrupts; its signal type is uninhabited.
struct Uninterrupted;

impl Interrupt for Uninterrupted {
    type Signal = Infallible;

    fn interrupted(&self) -> Option<Infallible> {
        None
    }

    async fn sleep(&self, delay: Duration) -> Option<Infallible> {
        tokio::time::sleep(delay).await;
        None
    }
}

impl Interrupt for CancellationToken {
    type Signal = ();

    fn interrupted(&self) -> Option<()> {
        self.is_cancelled().then_some(())
    }

    async fn sleep(&self, delay: Duration) -> Option<()> {
        tokio::select! {
            () = self.cancelled() => Some(()),
            () = tokio::time::sleep(delay) => None,
        }
    }
}

enum Halt<E, S> {
    Deadline(DeadlineExceeded<E>),
    Interrupted {
        signal: S,
        attempts: u32,
        elapsed: Duration,
        last_error: Option<E>,
    },
}

async fn poll<T, E, F, Fut, H, I>(
    mut check: F,
    policy: &RetryPolicy,
    on_retry: H,
    interrupt: &I,
) -> Result<T, Halt<E, I::Signal>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: Fn(&RetryEvent<'_, E>),
    I: Interrupt,
{
    let start = Instant::now();
    let mut state = policy.start();
    let mut last_error: Option<E> = None;

    loop {
        if let Some(signal) = interrupt.interrupted() {
            return Err(Halt::Interrupted {
                signal,
                attempts: state.attempts(),
                elapsed: start.elapsed(),
                last_error,
            });
        }

        let error = match check().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let next_delay = state.record_failure(start.elapsed(), policy.jitter().sample());
        on_retry(&RetryEvent {
            attempt: state.attempts(),
            error: &error,
            next_delay,
            elapsed: state.elapsed(),
            remaining: state.remaining(),
        });

        let Some(delay) = next_delay else {
            return Err(Halt::Deadline(DeadlineExceeded::new(
                error,
                state.attempts(),
                state.elapsed(),
            )));
        };

        if let Some(signal) = interrupt.sleep(delay).await {
            return Err(Halt::Interrupted {
                signal,
                attempts: state.attempts(),
                elapsed: start.elapsed(),
                last_error: Some(error),
            });
        }
        last_error = Some(error);
    }
}
