//! # Circuit Breaker Module
//!
//! Stops sending estimate requests to the inference service after repeated
//! consecutive failures, so a dead service does not cost a full retry cycle
//! for every remaining dish.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

/// Circuit breaker shared by every estimation worker
///
/// # State Machine
///
/// - **Closed**: requests pass through
/// - **Open**: `circuit_breaker_threshold` consecutive failures seen; requests
///   are skipped until `circuit_breaker_reset_secs` have passed
/// - After the reset window the breaker closes again and the next request is
///   a probe
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_count: Mutex<u32>,
    last_failure_time: Mutex<Option<Instant>>,
    threshold: u32,
    reset_after: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CircuitBreaker {
    /// # Examples
    ///
    /// ```rust
    /// use menu_pipeline::circuit_breaker::CircuitBreaker;
    /// use menu_pipeline::config::RecoveryConfig;
    ///
    /// let breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            failure_count: Mutex::new(0),
            last_failure_time: Mutex::new(None),
            threshold: config.circuit_breaker_threshold,
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    /// Whether requests should be skipped right now
    ///
    /// Resets to closed once the reset window has elapsed.
    pub fn is_open(&self) -> bool {
        let mut failure_count = lock(&self.failure_count);
        let mut last_failure = lock(&self.last_failure_time);

        if *failure_count >= self.threshold {
            if let Some(last_time) = *last_failure {
                if last_time.elapsed() < self.reset_after {
                    return true;
                }
                *failure_count = 0;
                *last_failure = None;
            }
        }
        false
    }

    pub fn record_failure(&self) {
        *lock(&self.failure_count) += 1;
        *lock(&self.last_failure_time) = Some(Instant::now());
    }

    pub fn record_success(&self) {
        *lock(&self.failure_count) = 0;
        *lock(&self.last_failure_time) = None;
    }

    pub fn failure_count(&self) -> u32 {
        *lock(&self.failure_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, reset_secs: u64) -> RecoveryConfig {
        RecoveryConfig {
            circuit_breaker_threshold: threshold,
            circuit_breaker_reset_secs: reset_secs,
            ..RecoveryConfig::default()
        }
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(&config(2, 60));
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes() {
        let breaker = CircuitBreaker::new(&config(1, 60));
        breaker.record_failure();
        assert!(breaker.is_open());
        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_resets_after_window() {
        let breaker = CircuitBreaker::new(&config(1, 0));
        breaker.record_failure();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }
}
