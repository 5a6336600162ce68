// Retry policy - attempt budget and delay schedule for operation polling
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

use crate::config::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_DELAY_SECS};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of polls, transient failures included.
    pub max_attempts: u32,
    /// Delay after the first unfinished poll.
    pub delay: Duration,
    /// Growth factor applied to the delay after each poll; 1.0 keeps it fixed.
    pub multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_ATTEMPTS, Duration::from_secs(DEFAULT_POLL_DELAY_SECS))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    pub fn with_backoff(mut self, multiplier: f64, max_delay: Duration) -> Self {
        self.multiplier = multiplier.max(1.0);
        self.max_delay = max_delay.max(self.delay);
        self
    }

    /// Delay schedule between consecutive polls, without jitter.
    pub fn delays(&self) -> Delays {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.delay)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_delay)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build();

        Delays {
            backoff,
            fallback: self.max_delay,
        }
    }

    /// Longest total time the poll loop can spend sleeping.
    pub fn max_wait(&self) -> Duration {
        self.delays()
            .take(self.max_attempts.saturating_sub(1) as usize)
            .sum()
    }
}

pub struct Delays {
    backoff: ExponentialBackoff,
    fallback: Duration,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.backoff.next_backoff().unwrap_or(self.fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 40);
        assert_eq!(policy.delay, Duration::from_secs(10));
        assert_eq!(policy.delays().take(3).collect::<Vec<_>>(), secs(&[10, 10, 10]));
        assert_eq!(policy.max_wait(), Duration::from_secs(390));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::fixed(6, Duration::from_secs(1)).with_backoff(2.0, Duration::from_secs(5));
        assert_eq!(policy.delays().take(5).collect::<Vec<_>>(), secs(&[1, 2, 4, 5, 5]));
    }

    #[test]
    fn test_single_attempt_never_waits() {
        assert_eq!(RetryPolicy::fixed(1, Duration::from_secs(10)).max_wait(), Duration::ZERO);
        assert_eq!(RetryPolicy::fixed(0, Duration::from_secs(10)).max_wait(), Duration::ZERO);
    }
}
