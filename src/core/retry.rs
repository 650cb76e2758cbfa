//! Retry budget and backoff schedule for upstream calls

use crate::core::constants::limits;
use std::time::Duration;

/// Backoff unit applied after an upstream 503
const OVERLOAD_BACKOFF: Duration = Duration::from_secs(2);

/// Backoff unit applied after a network failure
const NETWORK_BACKOFF: Duration = Duration::from_secs(1);

/// Linear backoff policy: the delay after attempt `n` is `n × unit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub overload_backoff: Duration,
    pub network_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, overload_backoff: Duration, network_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            overload_backoff,
            network_backoff,
        }
    }

    /// Whether another attempt may follow `attempt` (1-based)
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay after `attempt` failed with 503
    pub fn overload_delay(&self, attempt: u32) -> Duration {
        self.overload_backoff * attempt
    }

    /// Delay after `attempt` failed without a response
    pub fn network_delay(&self, attempt: u32) -> Duration {
        self.network_backoff * attempt
    }

    /// Upper bound on the time one request can spend sleeping between attempts
    pub fn max_total_backoff(&self) -> Duration {
        let unit = self.overload_backoff.max(self.network_backoff);
        (1..self.max_attempts).map(|attempt| unit * attempt).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(limits::MAX_ATTEMPTS, OVERLOAD_BACKOFF, NETWORK_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.overload_delay(1), Duration::from_secs(2));
        assert_eq!(policy.overload_delay(2), Duration::from_secs(4));
        assert_eq!(policy.network_delay(1), Duration::from_secs(1));
        assert_eq!(policy.network_delay(2), Duration::from_secs(2));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.has_attempts_left(1));
        assert!(policy.has_attempts_left(2));
        assert!(!policy.has_attempts_left(3));
    }

    #[test]
    fn test_max_total_backoff() {
        assert_eq!(RetryPolicy::default().max_total_backoff(), Duration::from_secs(6));
        let single = RetryPolicy::new(1, OVERLOAD_BACKOFF, NETWORK_BACKOFF);
        assert_eq!(single.max_total_backoff(), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::new(0, OVERLOAD_BACKOFF, NETWORK_BACKOFF);
        assert_eq!(policy.max_attempts, 1);
    }
}
