//! Property-based tests for the backoff state machine

use eventually::{RetryPolicy, RetryState, MIN_DELAY};
use proptest::prelude::*;
use std::time::Duration;

fn millis(max: u64) -> impl Strategy<Value = Duration> {
    (0..=max).prop_map(Duration::from_millis)
}

proptest! {
    #[test]
    fn prop_delay_never_exceeds_remaining(
        timeout in millis(10_000),
        initial in millis(1_000),
        steps in prop::collection::vec((millis(200), millis(9)), 1..50)
    ) {
        let mut state = RetryState::new(timeout, initial);
        let mut now = Duration::ZERO;

        for (check_cost, jitter) in steps {
            now += check_cost;
            match state.record_failure(now, jitter) {
                Some(delay) => {
                    prop_assert!(delay <= timeout.saturating_sub(now));
                    prop_assert!(delay >= MIN_DELAY.min(timeout.saturating_sub(now)));
                    now += delay;
                }
                None => {
                    prop_assert!(now >= timeout);
                    break;
                }
            }
        }
    }

    #[test]
    fn prop_uncapped_delays_are_non_decreasing(
        initial in millis(1_000),
        jitters in prop::collection::vec(millis(9), 1..30)
    ) {
        // A budget far beyond any reachable delay keeps the cap out of play.
        let mut state = RetryState::new(Duration::from_secs(86_400 * 365), initial);
        let mut prev = initial;
        let mut now = Duration::ZERO;

        for jitter in jitters {
            let delay = state.record_failure(now, jitter).unwrap();
            prop_assert!(delay >= prev);
            prop_assert_eq!(delay, (prev * 5 / 4 + jitter).max(MIN_DELAY));
            prev = delay;
            now += delay;
        }
    }

    #[test]
    fn prop_attempts_count_every_failure(
        timeout in millis(5_000),
        costs in prop::collection::vec(millis(100), 1..40)
    ) {
        let policy = RetryPolicy::new(timeout).without_jitter();
        let mut state = policy.start();
        let mut now = Duration::ZERO;
        let mut recorded = 0u32;

        for cost in costs {
            now += cost;
            recorded += 1;
            match state.record_failure(now, Duration::ZERO) {
                Some(delay) => now += delay,
                None => break,
            }
        }

        prop_assert_eq!(state.attempts(), recorded);
    }

    #[test]
    fn prop_exhaustion_iff_budget_spent(
        timeout in millis(5_000),
        elapsed in millis(6_000)
    ) {
        let mut state = RetryState::new(timeout, Duration::from_millis(100));
        let next = state.record_failure(elapsed, Duration::ZERO);

        prop_assert_eq!(next.is_none(), elapsed >= timeout);
        prop_assert_eq!(state.is_exhausted(), elapsed >= timeout);
    }
}
