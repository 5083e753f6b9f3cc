//! Retry policy for OpenFIGI lookups.

use std::time::Duration;

use crate::classify::AttemptOutcome;
use crate::config::duration_ms_from_env;
use crate::ValidationError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// How many attempts a lookup may make and how long to wait between them.
///
/// The wait after the n-th attempt of a run is `step * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1.
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    /// Default policy with the step taken from `OPENFIGI_RETRY_DELAY_MS`.
    pub fn from_env() -> Result<Self, ValidationError> {
        let step = duration_ms_from_env("OPENFIGI_RETRY_DELAY_MS", DEFAULT_BASE_DELAY)?;
        Ok(Self::linear(DEFAULT_MAX_ATTEMPTS, step))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Delay to wait after the `attempts_made`-th attempt (1-based) failed.
    pub fn delay_for_attempt(&self, attempts_made: u32) -> Duration {
        self.step.saturating_mul(attempts_made.max(1))
    }

    /// Retry only recoverable outcomes, and only while attempts remain.
    pub fn should_retry(&self, outcome: &AttemptOutcome, attempts_made: u32) -> bool {
        outcome.is_retryable() && attempts_made < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorCategory;

    #[test]
    fn delay_grows_linearly_with_attempts_made() {
        let policy = RetryPolicy::linear(5, Duration::from_millis(250));

        assert_eq!(policy.step(), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(750));
    }

    #[test]
    fn default_policy_is_three_attempts_two_second_step() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::linear(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts(), 1);
    }

    #[test]
    fn retries_recoverable_outcomes_until_budget_is_spent() {
        let policy = RetryPolicy::linear(3, Duration::ZERO);
        let recoverable = AttemptOutcome::RecoverableError {
            category: ErrorCategory::ServerError,
            message: String::from("HTTP error: status 500"),
        };
        let fatal = AttemptOutcome::FatalError {
            category: ErrorCategory::Unauthorized,
            message: String::from("HTTP error: status 401"),
        };

        assert!(policy.should_retry(&recoverable, 1));
        assert!(policy.should_retry(&recoverable, 2));
        assert!(!policy.should_retry(&recoverable, 3));
        assert!(!policy.should_retry(&fatal, 1));
        assert!(!policy.should_retry(&AttemptOutcome::Warning(String::from("w")), 1));
    }
}
