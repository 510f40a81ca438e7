//! Retry classification and delay scheduling shared by the Worker Pool
//! (spec §4.10 "Retry policy", §7 "Propagation policy").

use docvault_core::Error;
use std::time::Duration;

/// What a worker should do after a task step fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// Schedule the next attempt after the given delay.
    RetryAfter(Duration),
    /// The delay sequence is exhausted; transition the task to `failed`.
    Exhausted,
    /// The error class is not retryable at all; fail immediately.
    NonRetryable,
}

/// Classifies `error` against the configured delay sequence given the
/// number of attempts already made (0-indexed).
pub fn classify(error: &Error, attempts_made: usize, retry_delays_secs: &[u64]) -> RetryDecision {
    if !error.is_transient() {
        return RetryDecision::NonRetryable;
    }
    match retry_delays_secs.get(attempts_made) {
        Some(secs) => RetryDecision::RetryAfter(Duration::from_secs(*secs)),
        None => RetryDecision::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_error_retries_through_the_sequence() {
        let delays = [1, 2, 4, 8];
        let err = Error::Backend("x".into());
        assert_eq!(
            classify(&err, 0, &delays),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            classify(&err, 3, &delays),
            RetryDecision::RetryAfter(Duration::from_secs(8))
        );
        assert_eq!(classify(&err, 4, &delays), RetryDecision::Exhausted);
    }

    #[test]
    fn non_transient_error_is_never_retried() {
        let err = Error::ChecksumMismatch {
            declared: "a".into(),
            computed: "b".into(),
        };
        assert_eq!(classify(&err, 0, &[1, 2, 4, 8]), RetryDecision::NonRetryable);
    }
}
