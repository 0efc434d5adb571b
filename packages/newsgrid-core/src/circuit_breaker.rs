//! Per-domain circuit breaker state.
//!
//! One [`CircuitBreakerState`] tracks a single domain's recent fetch
//! failures. The fetcher in the server crate keeps one of these per domain
//! behind a concurrent map and consults [`CircuitBreakerState::is_open`]
//! before issuing a request.
//!
//! Unlike a phi-accrual failure detector, this is a simple counter: open
//! after `failure_threshold` consecutive failures, auto-reset after
//! `cooldown` has elapsed since the breaker opened.

use std::time::{Duration, Instant};

/// Default number of consecutive failures before a domain's breaker opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default cooldown before a tripped breaker is eligible to close again.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CircuitBreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreakerState {
    #[must_use]
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            opened_at: None,
            failure_threshold,
            cooldown,
        }
    }

    /// Records a successful fetch, decrementing the failure count by one
    /// (floor 0). The breaker itself only closes via the cooldown in
    /// [`Self::is_open`], not directly from a success.
    pub fn record_success(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_sub(1);
    }

    /// Records a failed fetch. Opens the breaker once `failure_threshold`
    /// consecutive failures have been recorded.
    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.failure_threshold && self.opened_at.is_none() {
            self.opened_at = Some(Instant::now());
        }
    }

    /// Whether the breaker currently blocks requests to this domain. Checked
    /// lazily: an open breaker whose cooldown has elapsed is treated as
    /// closed (and its state reset) without a background timer.
    pub fn is_open(&mut self) -> bool {
        match self.opened_at {
            None => false,
            Some(opened_at) => {
                if opened_at.elapsed() >= self.cooldown {
                    self.consecutive_failures = 0;
                    self.opened_at = None;
                    false
                } else {
                    true
                }
            }
        }
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_by_default() {
        let mut cb = CircuitBreakerState::default();
        assert!(!cb.is_open());
    }

    #[test]
    fn opens_after_threshold_failures() {
        let mut cb = CircuitBreakerState::new(3, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(!cb.is_open());
        cb.record_failure();
        assert!(cb.is_open());
    }

    #[test]
    fn success_decrements_failure_count() {
        let mut cb = CircuitBreakerState::new(3, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 1);
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 0);
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[test]
    fn success_does_not_force_close_an_open_breaker() {
        let mut cb = CircuitBreakerState::new(2, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_open());
        cb.record_success();
        assert!(cb.is_open());
    }

    #[test]
    fn auto_resets_after_cooldown() {
        let mut cb = CircuitBreakerState::new(1, Duration::from_millis(10));
        cb.record_failure();
        assert!(cb.is_open());
        std::thread::sleep(Duration::from_millis(20));
        assert!(!cb.is_open());
        assert_eq!(cb.consecutive_failures(), 0);
    }
}
