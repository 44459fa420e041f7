//! # Eventually
//!
//! > *"Keep asking until the answer stops changing"*
//!
//! Poll an async check until it stops failing, or until a deadline passes.
//!
//! End-to-end tests against an external system (a gateway picking up new
//! config, a data plane syncing from its control plane) cannot assert
//! immediately: the system needs time to converge. `eventually` reruns the
//! check with a jittered exponential backoff and, if time runs out, reports
//! the error from the *last* attempt, which is usually the one that explains
//! the divergence.
//!
//! ## Quick Example
//!
//! ```rust
//! use eventually::{eventually_with, RetryPolicy, Verbosity};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let polls = AtomicU32::new(0);
//! let policy = RetryPolicy::new(Duration::from_secs(5))
//!     .with_initial_delay(Duration::from_millis(10));
//!
//! let synced = eventually_with(
//!     || async {
//!         if polls.fetch_add(1, Ordering::SeqCst) < 2 {
//!             Err("data plane still on config hash 0000")
//!         } else {
//!             Ok("a1b2")
//!         }
//!     },
//!     &policy,
//!     &Verbosity::quiet(),
//! )
//! .await;
//!
//! assert_eq!(synced, Ok("a1b2"));
//! # });
//! ```
//!
//! ## Failure
//!
//! ```rust
//! use eventually::{eventually_with, RetryPolicy, Verbosity};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let err = eventually_with(
//!     || async { Err::<(), _>("x") },
//!     &RetryPolicy::new(Duration::from_millis(30)),
//!     &Verbosity::quiet(),
//! )
//! .await
//! .unwrap_err();
//!
//! assert!(err.to_string().starts_with("** Timed Out (after "));
//! assert!(err.to_string().ends_with("-- Last error: 'x' **"));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod eventually;
pub mod logging;
pub mod retry;
pub mod testing;

// Re-exports
pub use crate::eventually::{
    eventually, eventually_with, eventually_with_cancel, eventually_with_hooks,
};
pub use logging::{LogSettings, Verbosity, CONFIG_REBUILD_CONTEXT};
pub use retry::{
    DeadlineExceeded, EventuallyError, Jitter, RetryEvent, RetryPolicy, RetryState, MIN_DELAY,
};
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::eventually::{
        eventually, eventually_with, eventually_with_cancel, eventually_with_hooks,
    };
    pub use crate::logging::Verbosity;
    pub use crate::retry::{DeadlineExceeded, EventuallyError, RetryPolicy};
}
