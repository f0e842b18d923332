//! Retry/backoff policy shared by every vendor adapter (§4.3).
//!
//! Backoff is exponential with full jitter: `delay = rand(0, base * 2^attempt)`
//! capped at `max_delay`. A vendor `Retry-After` (surfaced as
//! [`crate::provider::ProviderError::RateLimited`]) overrides the computed
//! delay outright and is also pushed into the shared rate limiter so sibling
//! requests back off too.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the `attempt`-th retry (0-indexed: `attempt == 0` is the
    /// delay before the first retry, after the initial attempt failed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt.min(20));
        let ceiling = self.base_delay.saturating_mul(exp as u32).min(self.max_delay);
        let jittered_millis = rand::thread_rng().gen_range(0..=ceiling.as_millis().max(1) as u64);
        Duration::from_millis(jittered_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_exceeds_max() {
        let policy = RetryPolicy { max_attempts: 5, base_delay: Duration::from_millis(100), max_delay: Duration::from_secs(1) };
        for attempt in 0..10 {
            assert!(policy.backoff_delay(attempt) <= Duration::from_secs(1));
        }
    }

    #[test]
    fn default_allows_several_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts, 5);
    }
}
