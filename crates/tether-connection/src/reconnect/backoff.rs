//! Escalating delay between connection probe attempts

use std::time::Duration;

/// Exponential backoff: `initial * multiplier^attempt`, capped at `max`.
///
/// # Example
///
/// ```
/// use tether_connection::reconnect::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(200, 800);
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(200));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(400));
/// assert_eq!(backoff.calculate_delay(2), Duration::from_millis(800));
/// assert_eq!(backoff.calculate_delay(9), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    initial_ms: u64,
    max_ms: u64,
    multiplier: f64,
}

impl BackoffStrategy {
    /// Create a strategy doubling from `initial_ms` up to `max_ms`.
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
        }
    }

    /// Set the growth factor (at least 1.0).
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Delay to wait before retry number `attempt` (zero-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(exponent);
        Duration::from_millis(delay_ms.min(self.max_ms as f64) as u64)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Default for BackoffStrategy {
    /// 200ms, 400ms, 800ms, then 800ms
    fn default() -> Self {
        Self::new(200, 800)
    }
}
