//! Testing utilities for code built on `eventually`.
//!
//! # Examples
//!
//! ## FlakyCheck
//!
//! ```rust
//! use eventually::testing::FlakyCheck;
//! use eventually::{eventually_with, RetryPolicy, Verbosity};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let check = FlakyCheck::new(2, "synced");
//! let policy = RetryPolicy::new(Duration::from_secs(1))
//!     .with_initial_delay(Duration::from_millis(1));
//!
//! let value = eventually_with(|| check.call(), &policy, &Verbosity::quiet())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(value, "synced");
//! assert_eq!(check.attempts(), 3);
//! # });
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use eventually::{assert_deadline_exceeded, DeadlineExceeded};
//! use std::time::Duration;
//!
//! let result: Result<(), _> = Err(DeadlineExceeded::new("x", 4, Duration::from_millis(300)));
//! assert_deadline_exceeded!(result, "x");
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use futures::future::{ready, Ready};

/// A check that fails a fixed number of times, then succeeds.
///
/// Every call is counted, so tests can assert how many attempts an executor
/// made. `FlakyCheck::always_failing` never succeeds.
#[derive(Debug)]
pub struct FlakyCheck<T> {
    failures: Option<u32>,
    value: T,
    attempts: AtomicU32,
}

impl<T: Clone> FlakyCheck<T> {
    /// Fail `failures` times, then resolve to `value` on every later call.
    pub fn new(failures: u32, value: T) -> Self {
        Self {
            failures: Some(failures),
            value,
            attempts: AtomicU32::new(0),
        }
    }

    /// Run one attempt.
    ///
    /// Failing attempts report `"attempt {n} failed"` (1-indexed), so the
    /// last error of a timed-out call identifies the final attempt.
    pub fn call(&self) -> Ready<Result<T, String>> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.failures {
            Some(failures) if n >= failures => ready(Ok(self.value.clone())),
            _ => ready(Err(format!("attempt {} failed", n + 1))),
        }
    }

    /// Number of calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl FlakyCheck<()> {
    /// A check that never succeeds.
    pub fn always_failing() -> Self {
        Self {
            failures: None,
            value: (),
            attempts: AtomicU32::new(0),
        }
    }
}

/// Assert that a result is a deadline failure whose message contains `needle`.
///
/// Works with both `Result<_, DeadlineExceeded<_>>` and
/// `Result<_, EventuallyError<_>>`.
#[macro_export]
macro_rules! assert_deadline_exceeded {
    ($result:expr, $needle:expr) => {
        match $result {
            Ok(_) => panic!("Expected deadline failure, got Ok"),
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.contains("Timed Out"),
                    "Expected a deadline failure, got: {}",
                    message
                );
                assert!(
                    message.contains($needle),
                    "Expected {:?} in deadline message: {}",
                    $needle,
                    message
                );
            }
        }
    };
}
