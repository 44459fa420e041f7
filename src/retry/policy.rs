//! Retry policy types and the backoff state machine.

use std::time::Duration;

// Delay growth per failed attempt: x * 5 / 4 = x * 1.25, exact on nanoseconds.
const GROWTH_NUMERATOR: u32 = 5;
const GROWTH_DENOMINATOR: u32 = 4;

/// Shortest wait between attempts, unless less budget than this is left.
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Default time budget for a single `eventually` call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default delay before the first backoff growth is applied.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Default upper bound (exclusive) of the additive jitter.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(10);

/// A retry policy describing how long to keep polling and how fast.
///
/// Policies are pure data - they describe retry behavior but don't execute it.
/// The executors in [`crate::eventually`](mod@crate::eventually) drive a
/// [`RetryState`] built from the policy.
///
/// # Examples
///
/// ```rust
/// use eventually::{Jitter, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(Duration::from_secs(5))
///     .with_initial_delay(Duration::from_millis(50));
///
/// assert_eq!(policy.timeout(), Duration::from_secs(5));
/// assert_eq!(policy.initial_delay(), Duration::from_millis(50));
/// assert_eq!(policy.jitter(), &Jitter::Uniform(Duration::from_millis(10)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    timeout: Duration,
    initial_delay: Duration,
    jitter: Jitter,
}

/// Randomness added on top of each grown delay.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Jitter {
    /// No jitter; the backoff sequence is deterministic.
    None,
    /// Uniformly random extra delay in `[0, max)`.
    Uniform(Duration),
}

/// Information about a failed attempt, passed to hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt, or `None` if the deadline was reached.
    pub next_delay: Option<Duration>,
    /// Total elapsed time since the first attempt.
    pub elapsed: Duration,
    /// Budget left when the failure was recorded.
    pub remaining: Duration,
}

impl Default for Jitter {
    fn default() -> Self {
        Jitter::Uniform(DEFAULT_MAX_JITTER)
    }
}

impl Jitter {
    /// Draw one jitter sample.
    ///
    /// A zero-width uniform range yields `Duration::ZERO`.
    pub fn sample(&self) -> Duration {
        match self {
            Jitter::None => Duration::ZERO,
            Jitter::Uniform(max) if max.is_zero() => Duration::ZERO,
            Jitter::Uniform(max) => {
                use rand::Rng;
                let max_nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
                Duration::from_nanos(rand::rng().random_range(0..max_nanos))
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl RetryPolicy {
    /// Create a policy with the given time budget and default delay and jitter.
    ///
    /// A zero timeout is valid: the check still runs exactly once.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            initial_delay: DEFAULT_INITIAL_DELAY,
            jitter: Jitter::default(),
        }
    }

    /// Set the starting backoff interval.
    ///
    /// The first wait is already grown from this value, i.e. roughly
    /// `initial_delay * 1.25`.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the exclusive upper bound of the uniform jitter.
    pub fn with_jitter(mut self, max: Duration) -> Self {
        self.jitter = Jitter::Uniform(max);
        self
    }

    /// Disable jitter, making the delay sequence deterministic.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eventually::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(Duration::from_secs(10)).without_jitter();
    /// let mut state = policy.start();
    ///
    /// let first = state.record_failure(Duration::ZERO, policy.jitter().sample());
    /// assert_eq!(first, Some(Duration::from_millis(125)));
    /// ```
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Jitter::None;
        self
    }

    /// Total wall-clock budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Starting backoff interval.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Jitter applied to each delay.
    pub fn jitter(&self) -> &Jitter {
        &self.jitter
    }

    /// Fresh call-scoped state for this policy.
    pub fn start(&self) -> RetryState {
        RetryState::new(self.timeout, self.initial_delay)
    }
}

/// Mutable bookkeeping for a single polling call.
///
/// `RetryState` holds no clock; callers pass the elapsed time in. That keeps
/// the backoff arithmetic testable without sleeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    timeout: Duration,
    delay: Duration,
    elapsed: Duration,
    remaining: Duration,
    attempts: u32,
}

impl RetryState {
    /// Start polling with a full budget.
    pub fn new(timeout: Duration, initial_delay: Duration) -> Self {
        Self {
            timeout,
            delay: initial_delay,
            elapsed: Duration::ZERO,
            remaining: timeout,
            attempts: 0,
        }
    }

    /// Record a failed attempt observed `elapsed` after the call started.
    ///
    /// Returns the delay to wait before the next attempt, or `None` once the
    /// budget is spent. The returned delay is at least [`MIN_DELAY`] and never
    /// exceeds the remaining budget.
    pub fn record_failure(&mut self, elapsed: Duration, jitter: Duration) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        self.elapsed = elapsed;
        self.remaining = self.timeout.saturating_sub(elapsed);

        if self.remaining.is_zero() {
            return None;
        }

        let grown = self
            .delay
            .checked_mul(GROWTH_NUMERATOR)
            .map_or(Duration::MAX, |d| d / GROWTH_DENOMINATOR)
            .saturating_add(jitter);
        self.delay = grown.max(MIN_DELAY).min(self.remaining);
        Some(self.delay)
    }

    /// Number of failed attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Elapsed time at the last recorded failure.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Budget left at the last recorded failure.
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Current backoff interval.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempts > 0 && self.remaining.is_zero()
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_helper_defaults() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.timeout(), Duration::from_millis(120_000));
        assert_eq!(policy.initial_delay(), Duration::from_millis(100));
        assert_eq!(policy.jitter(), &Jitter::Uniform(Duration::from_millis(10)));
    }

    #[test]
    fn test_backoff_grows_by_factor() {
        let mut state = RetryState::new(Duration::from_secs(60), Duration::from_millis(100));

        assert_eq!(
            state.record_failure(Duration::ZERO, Duration::ZERO),
            Some(Duration::from_millis(125))
        );
        assert_eq!(
            state.record_failure(Duration::from_millis(125), Duration::ZERO),
            Some(Duration::from_micros(156_250))
        );
        assert_eq!(state.attempts(), 2);
    }

    #[test]
    fn test_jitter_is_added_after_growth() {
        let mut state = RetryState::new(Duration::from_secs(60), Duration::from_millis(100));

        let delay = state.record_failure(Duration::ZERO, Duration::from_millis(7));
        assert_eq!(delay, Some(Duration::from_millis(132)));
    }

    #[test]
    fn test_delay_capped_at_remaining() {
        let mut state = RetryState::new(Duration::from_millis(300), Duration::from_millis(100));

        let delay = state.record_failure(Duration::from_millis(250), Duration::ZERO);
        assert_eq!(delay, Some(Duration::from_millis(50)));
        assert_eq!(state.remaining(), Duration::from_millis(50));
    }

    #[test]
    fn test_zero_delay_without_jitter_waits_min_delay() {
        let mut state = RetryState::new(Duration::from_secs(1), Duration::ZERO);

        assert_eq!(
            state.record_failure(Duration::ZERO, Duration::ZERO),
            Some(MIN_DELAY)
        );
        assert_eq!(
            state.record_failure(Duration::from_millis(1), Duration::ZERO),
            Some(Duration::from_micros(1_250))
        );
    }

    #[test]
    fn test_min_delay_still_capped_at_remaining() {
        let mut state = RetryState::new(Duration::from_micros(300), Duration::ZERO);

        assert_eq!(
            state.record_failure(Duration::ZERO, Duration::ZERO),
            Some(Duration::from_micros(300))
        );
    }

    #[test]
    fn test_capped_delay_feeds_next_growth() {
        let mut state = RetryState::new(Duration::from_secs(10), Duration::from_millis(100));

        state.record_failure(Duration::from_millis(9_960), Duration::ZERO);
        assert_eq!(state.delay(), Duration::from_millis(40));

        let mut state = RetryState::new(Duration::from_secs(10), Duration::from_millis(40));
        assert_eq!(
            state.record_failure(Duration::ZERO, Duration::ZERO),
            Some(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_exhausted_when_elapsed_reaches_timeout() {
        let mut state = RetryState::new(Duration::from_millis(300), Duration::from_millis(100));

        assert_eq!(state.record_failure(Duration::from_millis(300), Duration::ZERO), None);
        assert!(state.is_exhausted());

        let mut late = RetryState::new(Duration::from_millis(300), Duration::from_millis(100));
        assert_eq!(late.record_failure(Duration::from_secs(5), Duration::ZERO), None);
        assert_eq!(late.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_zero_timeout_exhausts_on_first_failure() {
        let mut state = RetryPolicy::new(Duration::ZERO).start();

        assert!(!state.is_exhausted());
        assert_eq!(state.record_failure(Duration::ZERO, Duration::ZERO), None);
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn test_huge_delay_saturates() {
        let mut state = RetryState::new(Duration::MAX, Duration::MAX);

        let delay = state.record_failure(Duration::ZERO, Duration::from_millis(5));
        assert_eq!(delay, Some(Duration::MAX));
    }

    #[test]
    fn test_uniform_jitter_stays_in_range() {
        let jitter = Jitter::Uniform(Duration::from_millis(10));
        for _ in 0..1_000 {
            assert!(jitter.sample() < Duration::from_millis(10));
        }
    }

    #[test]
    fn test_degenerate_jitter_is_zero() {
        assert_eq!(Jitter::None.sample(), Duration::ZERO);
        assert_eq!(Jitter::Uniform(Duration::ZERO).sample(), Duration::ZERO);
    }

    #[test]
    fn test_builder_overrides() {
        let policy = RetryPolicy::new(Duration::from_secs(1))
            .with_initial_delay(Duration::from_millis(5))
            .with_jitter(Duration::from_millis(2));

        assert_eq!(policy.initial_delay(), Duration::from_millis(5));
        assert_eq!(policy.jitter(), &Jitter::Uniform(Duration::from_millis(2)));
        assert_eq!(policy.clone().without_jitter().jitter(), &Jitter::None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_policy_serde() {
        let policy = RetryPolicy::new(Duration::from_secs(3)).without_jitter();
        let json = serde_json::to_string(&policy).unwrap();
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
