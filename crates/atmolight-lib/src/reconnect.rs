//! Bounded reconnection budget for target connect sequences.
//!
//! A connect sequence makes one initial attempt plus up to `max_attempts`
//! retries, pausing a fixed delay between them. Once the budget is spent
//! the sequence stops and the target stays idle until re-initialised.

use std::time::Duration;

/// Configuration for a connect sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Retries allowed after the first failed attempt.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}

/// What the caller should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAttempt {
    /// Sleep this long, then try again.
    RetryAfter(Duration),
    /// Budget spent; report the connection as lost.
    GiveUp,
}

/// Retry counter for one connect sequence.
#[derive(Debug)]
pub struct ReconnectState {
    config: ReconnectConfig,
    consecutive_failures: u32,
}

impl ReconnectState {
    /// Create a new reconnection state with the given config.
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    /// Record a failed attempt and decide whether to try again.
    pub fn record_failure(&mut self) -> NextAttempt {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.is_exhausted() {
            NextAttempt::GiveUp
        } else {
            NextAttempt::RetryAfter(self.config.delay)
        }
    }

    /// Record a successful connect and reset the counter.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Whether the failure count has gone past the retry budget.
    pub fn is_exhausted(&self) -> bool {
        self.consecutive_failures > self.config.max_attempts
    }

    /// Number of consecutive failed attempts.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Total attempts the budget allows (first attempt plus retries).
    pub fn total_attempts(&self) -> u32 {
        self.config.max_attempts.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.delay, Duration::from_secs(10));
    }

    #[test]
    fn initial_state_is_not_exhausted() {
        let state = ReconnectState::new(ReconnectConfig::default());
        assert!(!state.is_exhausted());
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn retries_with_fixed_delay_until_budget_spent() {
        let config = ReconnectConfig {
            max_attempts: 2,
            delay: Duration::from_millis(100),
        };
        let mut state = ReconnectState::new(config);

        assert_eq!(
            state.record_failure(),
            NextAttempt::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(
            state.record_failure(),
            NextAttempt::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(state.record_failure(), NextAttempt::GiveUp);
        assert_eq!(state.consecutive_failures(), 3);
        assert!(state.is_exhausted());
    }

    #[test]
    fn budget_allows_max_plus_one_attempts() {
        for max in [0, 1, 5] {
            let mut state = ReconnectState::new(ReconnectConfig {
                max_attempts: max,
                delay: Duration::ZERO,
            });
            let mut attempts = 1;
            while state.record_failure() != NextAttempt::GiveUp {
                attempts += 1;
            }
            assert_eq!(attempts, max + 1);
            assert_eq!(state.total_attempts(), max + 1);
        }
    }

    #[test]
    fn zero_retries_gives_up_after_first_failure() {
        let mut state = ReconnectState::new(ReconnectConfig {
            max_attempts: 0,
            delay: Duration::from_secs(1),
        });
        assert_eq!(state.record_failure(), NextAttempt::GiveUp);
    }

    #[test]
    fn success_resets_counter() {
        let mut state = ReconnectState::new(ReconnectConfig::default());

        state.record_failure();
        state.record_failure();
        assert_eq!(state.consecutive_failures(), 2);

        state.record_success();
        assert_eq!(state.consecutive_failures(), 0);
        assert!(!state.is_exhausted());
    }

    #[test]
    fn multiple_success_calls_idempotent() {
        let mut state = ReconnectState::new(ReconnectConfig::default());
        state.record_failure();

        state.record_success();
        state.record_success();

        assert_eq!(state.consecutive_failures(), 0);
    }
}
