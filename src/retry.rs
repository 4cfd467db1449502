//! Retry policy and backoff calculation
//!
//! One attempt sequence walks `Attempting(1) -> ... -> Attempting(n)` until a
//! terminal verdict. The policy is stateless: given the attempt number and
//! the response it answers retry, success, or failure, and computes the
//! backoff delay for the retry path.

use std::time::Duration;

use rand::Rng;

use crate::target::{SubmitOutcome, TargetError};

/// Backoff strategy for retries between attempts
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// Uniform random delay in a fixed window
    FixedWindow {
        /// Lower bound of the window
        min: Duration,
        /// Upper bound of the window
        max: Duration,
    },

    /// Exponential growth: `min(base * 2^(attempt-1), cap)`
    Exponential {
        /// Delay for the first retry
        base: Duration,
        /// Upper bound on the delay
        cap: Duration,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(60),
        }
    }
}

/// Terminal or non-terminal verdict for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Attempt succeeded; sequence ends, record a success
    Success,
    /// Attempt failed retryably and budget remains; back off and try again
    Retry,
    /// Attempt failed terminally or budget is exhausted; record a failure
    Failure,
}

/// Stateless retry policy applied to every attempt sequence
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per sequence (including the first)
    pub max_attempts: u32,

    /// Backoff strategy between attempts
    pub strategy: BackoffStrategy,

    /// Whether to jitter exponential delays by +/-20%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: BackoffStrategy::default(),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the exponential strategy
    pub fn exponential(max_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts,
            strategy: BackoffStrategy::Exponential { base, cap },
            jitter: true,
        }
    }

    /// Create a policy with a fixed jittered window
    pub fn fixed_window(max_attempts: u32, min: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            strategy: BackoffStrategy::FixedWindow { min, max },
            jitter: false,
        }
    }

    /// Map an attempt result to a verdict
    ///
    /// `attempt` is 1-indexed. Accepted responses always succeed; a blocked
    /// response or retryable transport error retries while budget remains;
    /// any other rejection or terminal transport error is an immediate
    /// failure.
    pub fn assess(&self, attempt: u32, result: &Result<SubmitOutcome, TargetError>) -> Verdict {
        match result {
            Ok(SubmitOutcome::Accepted) => Verdict::Success,
            Ok(SubmitOutcome::Blocked) => self.retry_or_exhaust(attempt),
            Ok(SubmitOutcome::Rejected(_)) => Verdict::Failure,
            Err(e) if e.is_retryable() => self.retry_or_exhaust(attempt),
            Err(_) => Verdict::Failure,
        }
    }

    fn retry_or_exhaust(&self, attempt: u32) -> Verdict {
        if attempt < self.max_attempts {
            Verdict::Retry
        } else {
            Verdict::Failure
        }
    }

    /// Backoff delay before retrying after attempt `attempt` (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        match self.strategy {
            BackoffStrategy::FixedWindow { min, max } => {
                if max <= min {
                    return min;
                }
                let range = (max - min).as_nanos() as u64;
                min + Duration::from_nanos(rng.gen_range(0..=range))
            }
            BackoffStrategy::Exponential { base, cap } => {
                let exp = attempt.saturating_sub(1).min(31);
                let grown = base
                    .checked_mul(1u32 << exp)
                    .unwrap_or(cap)
                    .min(cap);
                if self.jitter {
                    let factor = rng.gen_range(0.8..1.2);
                    Duration::from_nanos((grown.as_nanos() as f64 * factor) as u64)
                } else {
                    grown
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn transport_error() -> TargetError {
        TargetError::Timeout(Duration::from_secs(30))
    }

    #[test]
    fn test_accepted_is_success_on_any_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.assess(1, &Ok(SubmitOutcome::Accepted)), Verdict::Success);
        assert_eq!(policy.assess(3, &Ok(SubmitOutcome::Accepted)), Verdict::Success);
    }

    #[test]
    fn test_blocked_retries_until_budget_exhausted() {
        let policy = RetryPolicy::default(); // max_attempts = 3
        assert_eq!(policy.assess(1, &Ok(SubmitOutcome::Blocked)), Verdict::Retry);
        assert_eq!(policy.assess(2, &Ok(SubmitOutcome::Blocked)), Verdict::Retry);
        assert_eq!(policy.assess(3, &Ok(SubmitOutcome::Blocked)), Verdict::Failure);
    }

    #[test]
    fn test_transport_error_mirrors_blocked_path() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.assess(1, &Err(transport_error())), Verdict::Retry);
        assert_eq!(policy.assess(3, &Err(transport_error())), Verdict::Failure);
    }

    #[test]
    fn test_non_retryable_transport_error_fails_immediately() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.assess(1, &Err(TargetError::UnexpectedStatus(500))),
            Verdict::Failure
        );
    }

    #[test]
    fn test_rejected_fails_immediately() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.assess(1, &Ok(SubmitOutcome::Rejected(500))),
            Verdict::Failure
        );
    }

    #[test]
    fn test_exponential_delay_within_jitter_bounds() {
        let policy = RetryPolicy::exponential(
            5,
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let mut rng = StdRng::seed_from_u64(9);

        for attempt in 1..=8u32 {
            let expected = Duration::from_secs(1)
                .checked_mul(1u32 << (attempt - 1))
                .unwrap_or(Duration::from_secs(60))
                .min(Duration::from_secs(60));
            let lo = Duration::from_nanos((expected.as_nanos() as f64 * 0.8) as u64);
            let hi = Duration::from_nanos((expected.as_nanos() as f64 * 1.2) as u64);

            for _ in 0..20 {
                let delay = policy.delay_for_attempt(attempt, &mut rng);
                assert!(delay >= lo, "attempt {attempt}: {delay:?} < {lo:?}");
                assert!(delay <= hi, "attempt {attempt}: {delay:?} > {hi:?}");
            }
        }
    }

    #[test]
    fn test_exponential_without_jitter_is_exact() {
        let mut policy =
            RetryPolicy::exponential(5, Duration::from_millis(100), Duration::from_millis(500));
        policy.jitter = false;
        let mut rng = StdRng::seed_from_u64(10);

        assert_eq!(policy.delay_for_attempt(1, &mut rng), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2, &mut rng), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3, &mut rng), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4, &mut rng), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10, &mut rng), Duration::from_millis(500));
    }

    #[test]
    fn test_fixed_window_stays_in_window() {
        let policy = RetryPolicy::fixed_window(
            3,
            Duration::from_millis(1000),
            Duration::from_millis(2000),
        );
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..100 {
            let delay = policy.delay_for_attempt(1, &mut rng);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(2000));
        }
    }

    #[test]
    fn test_fixed_window_degenerate_range() {
        let policy =
            RetryPolicy::fixed_window(3, Duration::from_secs(1), Duration::from_secs(1));
        let mut rng = StdRng::seed_from_u64(12);
        assert_eq!(policy.delay_for_attempt(1, &mut rng), Duration::from_secs(1));
    }
}
