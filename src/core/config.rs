//! Session parameters and their supported ranges

use crate::types::RunnerError;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Supported base delay range in milliseconds
pub const SPEED_RANGE_MS: RangeInclusive<u64> = 500..=5000;

/// Supported concurrency limit range
pub const CONCURRENCY_RANGE: RangeInclusive<usize> = 1..=20;

/// Base delay used when the operator does not choose one
pub const DEFAULT_SPEED_MS: u64 = 2000;

/// Concurrency limit used when the operator does not choose one
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Validated parameters for one run
///
/// Controls how long each record is held in flight (before jitter) and how
/// many records a wave admits at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base delay in milliseconds
    speed_ms: u64,
    /// Maximum wave size
    concurrency_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speed_ms: DEFAULT_SPEED_MS,
            concurrency_limit: DEFAULT_CONCURRENCY,
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig
    ///
    /// # Arguments
    ///
    /// * `speed_ms` - Base delay per record, 500..=5000
    /// * `concurrency_limit` - Records admitted per wave, 1..=20
    ///
    /// # Returns
    ///
    /// * `Ok(SessionConfig)` - Both values are in range
    /// * `Err(RunnerError::InvalidConcurrency)` - Concurrency out of range
    /// * `Err(RunnerError::InvalidSpeed)` - Speed out of range
    pub fn new(speed_ms: u64, concurrency_limit: usize) -> Result<Self, RunnerError> {
        if !CONCURRENCY_RANGE.contains(&concurrency_limit) {
            return Err(RunnerError::invalid_concurrency(
                concurrency_limit,
                *CONCURRENCY_RANGE.start(),
                *CONCURRENCY_RANGE.end(),
            ));
        }

        if !SPEED_RANGE_MS.contains(&speed_ms) {
            return Err(RunnerError::invalid_speed(
                speed_ms,
                *SPEED_RANGE_MS.start(),
                *SPEED_RANGE_MS.end(),
            ));
        }

        Ok(Self {
            speed_ms,
            concurrency_limit,
        })
    }

    pub fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.speed_ms)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert_eq!(
            SessionConfig::new(config.speed_ms(), config.concurrency_limit()),
            Ok(config)
        );
        assert_eq!(config.base_delay(), Duration::from_millis(2000));
    }

    #[rstest]
    #[case::lowest(500, 1)]
    #[case::highest(5000, 20)]
    #[case::middle(1200, 7)]
    fn test_accepts_values_in_range(#[case] speed_ms: u64, #[case] concurrency: usize) {
        let config = SessionConfig::new(speed_ms, concurrency).unwrap();
        assert_eq!(config.speed_ms(), speed_ms);
        assert_eq!(config.concurrency_limit(), concurrency);
    }

    #[rstest]
    #[case::zero_concurrency(2000, 0, RunnerError::invalid_concurrency(0, 1, 20))]
    #[case::too_much_concurrency(2000, 21, RunnerError::invalid_concurrency(21, 1, 20))]
    #[case::too_fast(499, 5, RunnerError::invalid_speed(499, 500, 5000))]
    #[case::too_slow(5001, 5, RunnerError::invalid_speed(5001, 500, 5000))]
    fn test_rejects_values_out_of_range(
        #[case] speed_ms: u64,
        #[case] concurrency: usize,
        #[case] expected: RunnerError,
    ) {
        assert_eq!(SessionConfig::new(speed_ms, concurrency), Err(expected));
    }
}
