//! Retry configuration with exponential backoff

use rand::Rng;
use std::time::Duration;

use crate::config::ExecutorConfig;
use crate::error_classifier::ParsedError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0); zero keeps delays exact
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.0,
        }
    }
}

impl From<&ExecutorConfig> for RetryConfig {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_retry_delay_ms,
            max_delay_ms: config.max_retry_delay_ms,
            jitter_factor: 0.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Delay after the given failed attempt (0-indexed): `base * 2^attempt`, capped
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exp_backoff = (self.base_delay_ms as f64) * 2_f64.powi(attempt as i32);
        let capped = exp_backoff.min(self.max_delay_ms as f64);

        if self.jitter_factor <= 0.0 {
            return Duration::from_millis(capped as u64);
        }
        let jitter_range = capped * self.jitter_factor;
        let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    /// Only connectivity failures and transient contract conditions qualify
    pub fn should_retry(&self, parsed: Option<&ParsedError>) -> bool {
        parsed.is_some_and(ParsedError::allows_auto_retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_classifier::{ErrorType, Severity};

    #[test]
    fn test_backoff_doubles_from_two_seconds() {
        let config = RetryConfig::default();
        assert_eq!(config.calculate_backoff(0), Duration::from_secs(2));
        assert_eq!(config.calculate_backoff(1), Duration::from_secs(4));
        assert_eq!(config.calculate_backoff(2), Duration::from_secs(8));
        assert_eq!(config.calculate_backoff(10), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig::default().with_jitter(0.5);
        for _ in 0..50 {
            let d = config.calculate_backoff(0).as_millis();
            assert!((1_000..=3_000).contains(&d));
        }
    }

    #[test]
    fn test_retry_decision() {
        let config = RetryConfig::default();
        let rejection = ParsedError::new(ErrorType::UserRejection, Severity::Low, true, "x");
        let network = ParsedError::new(ErrorType::NetworkError, Severity::Medium, true, "x");
        let paused = ParsedError::new(ErrorType::ContractError, Severity::Critical, false, "x");
        assert!(!config.should_retry(Some(&rejection)));
        assert!(config.should_retry(Some(&network)));
        assert!(!config.should_retry(Some(&paused)));
        assert!(!config.should_retry(None));
    }

    #[test]
    fn test_from_executor_config() {
        let config = RetryConfig::from(&ExecutorConfig::default());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_ms, 2_000);
    }
}
