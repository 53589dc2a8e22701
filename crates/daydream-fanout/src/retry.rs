// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch retry schedule: exponential backoff plus uniform jitter.

use std::time::Duration;

use rand::Rng;

use daydream_config::model::FanoutConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per batch, including the first. Never below 1.
    pub max_attempts: u32,
    /// Delay before the first retry, before jitter.
    pub base: Duration,
    /// Upper bound of the uniform jitter added to every delay.
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FanoutConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FanoutConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base: Duration::from_millis(config.backoff_base_ms),
            jitter_max: Duration::from_millis(config.jitter_max_ms),
        }
    }

    /// Delay before retrying after failed attempt `attempt` (0-based):
    /// `base * 2^attempt + U(0, jitter_max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let (low, high) = self.bounds(attempt);
        if high <= low {
            return low;
        }
        let spread = (high - low).as_millis() as u64;
        low + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }

    /// Inclusive range `delay(attempt)` is drawn from.
    pub fn bounds(&self, attempt: u32) -> (Duration, Duration) {
        let factor = 2u32.saturating_pow(attempt);
        let low = self.base.saturating_mul(factor);
        (low, low.saturating_add(self.jitter_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base: Duration::from_millis(500),
            jitter_max: Duration::from_millis(250),
        }
    }

    #[test]
    fn defaults_from_config() {
        assert_eq!(RetryPolicy::default(), policy());
    }

    #[test]
    fn bounds_double_each_attempt() {
        let p = policy();
        assert_eq!(p.bounds(0), (Duration::from_millis(500), Duration::from_millis(750)));
        assert_eq!(p.bounds(1), (Duration::from_millis(1000), Duration::from_millis(1250)));
        assert_eq!(p.bounds(2), (Duration::from_millis(2000), Duration::from_millis(2250)));
    }

    #[test]
    fn bounds_strictly_increase() {
        let p = policy();
        for attempt in 0..p.max_attempts {
            let (low, high) = p.bounds(attempt);
            let (next_low, next_high) = p.bounds(attempt + 1);
            assert!(next_low > low);
            assert!(next_high > high);
        }
    }

    #[test]
    fn delay_stays_within_bounds() {
        let p = policy();
        for attempt in 0..4 {
            let (low, high) = p.bounds(attempt);
            for _ in 0..50 {
                let d = p.delay(attempt);
                assert!(d >= low && d <= high, "attempt {attempt}: {d:?}");
            }
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let p = RetryPolicy {
            jitter_max: Duration::ZERO,
            ..policy()
        };
        assert_eq!(p.delay(1), Duration::from_millis(1000));
    }

    #[test]
    fn huge_attempt_saturates() {
        let (low, _) = policy().bounds(200);
        assert!(low >= Duration::from_secs(1_000_000));
    }

    #[test]
    fn max_attempts_floor_is_one() {
        let config = FanoutConfig {
            max_attempts: 0,
            ..FanoutConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }
}
