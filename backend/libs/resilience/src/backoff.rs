/// Reconnect schedule with exponential backoff and jitter
///
/// The schedule only computes delays; the caller owns the decision of whether to
/// reconnect at all (session still active, network believed up).
use rand::Rng;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Maximum number of consecutive reconnect attempts before giving up
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth
    pub backoff_multiplier: f64,
    /// Add random jitter to each delay (±30%)
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Delay to wait before reconnect attempt number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let base_ms = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = Duration::from_millis(base_ms.min(self.max_backoff.as_millis() as f64) as u64);

        let delay = apply_jitter(capped, self.jitter);
        delay.min(self.max_backoff)
    }

    /// Whether `attempt` (1-based) is beyond the configured budget
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        if attempt > self.max_attempts {
            warn!("Max reconnect attempts ({}) reached", self.max_attempts);
            return true;
        }
        false
    }
}

fn apply_jitter(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let mut rng = rand::thread_rng();
        let jitter_factor = 1.0 + rng.gen_range(-0.3..0.3); // ±30%
        Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> BackoffConfig {
        BackoffConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_exponential_growth_is_capped() {
        let config = fixed();
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(350));
    }

    #[test]
    fn test_attempt_zero_uses_initial_backoff() {
        assert_eq!(fixed().delay_for_attempt(0), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = BackoffConfig {
            jitter: true,
            max_backoff: Duration::from_secs(10),
            ..fixed()
        };
        for _ in 0..50 {
            let delay = config.delay_for_attempt(1);
            assert!(delay >= Duration::from_millis(70));
            assert!(delay <= Duration::from_millis(130));
        }
    }

    #[test]
    fn test_budget() {
        let config = fixed();
        assert!(!config.is_exhausted(1));
        assert!(!config.is_exhausted(3));
        assert!(config.is_exhausted(4));
    }
}
