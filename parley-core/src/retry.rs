// ABOUTME: Bounded fixed-delay retry policy shared by channels and the registry.
// ABOUTME: max_retries counts total attempts per operation; 0 means retry forever.

use std::time::Duration;

/// Retry configuration for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first (0 = unlimited)
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_retries == 0
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Tracks failed attempts for one operation
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    failures: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Continue a budget of which `failures` attempts are already spent
    pub fn resume(policy: RetryPolicy, failures: u32) -> Self {
        Self { policy, failures }
    }

    /// Record a failed attempt and return the delay before the next one,
    /// or None once the attempt budget is spent
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);

        if !self.policy.is_unlimited() && self.failures >= self.policy.max_retries {
            return None;
        }

        Some(self.policy.retry_delay)
    }

    /// Failed attempts so far
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_budget_counts_total_attempts() {
        let mut state = RetryState::new(RetryPolicy::new(3, Duration::from_millis(10)));

        assert_eq!(state.record_failure(), Some(Duration::from_millis(10)));
        assert_eq!(state.record_failure(), Some(Duration::from_millis(10)));
        // Third failed attempt spends the budget
        assert_eq!(state.record_failure(), None);
        assert_eq!(state.failures(), 3);
    }

    #[test]
    fn test_single_attempt_never_waits() {
        let mut state = RetryState::new(RetryPolicy::new(1, Duration::from_secs(5)));
        assert_eq!(state.record_failure(), None);
    }

    #[test]
    fn test_unlimited_retries() {
        let mut state = RetryState::new(RetryPolicy::new(0, Duration::from_millis(1)));
        for _ in 0..100 {
            assert!(state.record_failure().is_some());
        }
        assert_eq!(state.failures(), 100);
    }

    #[test]
    fn test_resumed_state_keeps_spent_attempts() {
        let mut state = RetryState::resume(RetryPolicy::new(3, Duration::from_millis(5)), 2);
        assert_eq!(state.failures(), 2);
        assert_eq!(state.record_failure(), None);
        assert_eq!(state.failures(), 3);
    }
}
