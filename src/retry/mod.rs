//! Retry policy, backoff state and error types.
//!
//! Following the "pure core, imperative shell" split:
//!
//! - **Pure Core**: [`RetryPolicy`] and [`RetryState`] are plain data; the
//!   backoff arithmetic never touches a clock.
//! - **Imperative Shell**: the executors in [`crate::eventually`](mod@crate::eventually)
//!   own the clock, the sleeps and the logging.
//!
//! # Backoff
//!
//! After each failed attempt the delay grows by ×1.25, gains a small uniform
//! jitter (`[0, 10ms)` by default), and is capped at the budget that is left:
//!
//! ```rust
//! use eventually::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(Duration::from_millis(300)).without_jitter();
//! let mut state = policy.start();
//!
//! assert_eq!(state.record_failure(Duration::ZERO, Duration::ZERO), Some(Duration::from_millis(125)));
//! // Only 20ms left: the wait is capped so polling never overshoots the deadline.
//! assert_eq!(state.record_failure(Duration::from_millis(280), Duration::ZERO), Some(Duration::from_millis(20)));
//! // Budget spent: stop without waiting.
//! assert_eq!(state.record_failure(Duration::from_millis(300), Duration::ZERO), None);
//! ```
//!
//! # Error Types
//!
//! - [`DeadlineExceeded`]: no attempt succeeded in time; holds the last error
//! - [`EventuallyError`]: deadline or cancellation, for cancellable polling

mod error;
mod policy;

pub use error::{DeadlineExceeded, EventuallyError};
pub use policy::{
    Jitter, RetryEvent, RetryPolicy, RetryState, DEFAULT_INITIAL_DELAY,
    DEFAULT_MAX_JITTER, DEFAULT_TIMEOUT, MIN_DELAY,
};
