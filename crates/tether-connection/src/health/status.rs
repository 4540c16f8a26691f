//! Health classification of a managed connection

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::PingResult;

/// Coarse health reported by `ConnectionManager::status` and the CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    /// Answering, but slower than the healthy threshold
    Degraded,
    /// Slower than the degraded threshold, failing, or not connected
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// A failed probe is always `Unhealthy`.
    pub fn from_probe(result: &PingResult, thresholds: &HealthThresholds) -> Self {
        match result {
            Ok(latency) => thresholds.classify(*latency),
            Err(_) => HealthStatus::Unhealthy,
        }
    }

    /// Health of a manager's current state.
    ///
    /// A recorded failure or a missing handle wins over latency. With no
    /// latency sample yet (the handle was validated by the opening probe)
    /// the connection counts as healthy.
    pub fn from_state(
        connected: bool,
        failing: bool,
        last_latency: Option<Duration>,
        thresholds: &HealthThresholds,
    ) -> Self {
        if failing || !connected {
            return HealthStatus::Unhealthy;
        }
        last_latency.map_or(HealthStatus::Healthy, |latency| thresholds.classify(latency))
    }

    /// `Healthy` and `Degraded` connections still serve statements.
    pub fn is_usable(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy)
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency limits for [`HealthStatus`]; both bounds are inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthThresholds {
    healthy: Duration,
    degraded: Duration,
}

impl HealthThresholds {
    /// `degraded_ms` is raised to `healthy_ms` if lower.
    pub fn new(healthy_ms: u64, degraded_ms: u64) -> Self {
        Self {
            healthy: Duration::from_millis(healthy_ms),
            degraded: Duration::from_millis(degraded_ms.max(healthy_ms)),
        }
    }

    pub fn healthy(&self) -> Duration {
        self.healthy
    }

    pub fn degraded(&self) -> Duration {
        self.degraded
    }

    /// ```
    /// use std::time::Duration;
    /// use tether_connection::{HealthStatus, HealthThresholds};
    ///
    /// let thresholds = HealthThresholds::default();
    /// assert_eq!(thresholds.classify(Duration::from_millis(40)), HealthStatus::Healthy);
    /// assert_eq!(thresholds.classify(Duration::from_millis(200)), HealthStatus::Degraded);
    /// assert_eq!(thresholds.classify(Duration::from_secs(1)), HealthStatus::Unhealthy);
    /// ```
    pub fn classify(&self, latency: Duration) -> HealthStatus {
        if latency <= self.healthy {
            HealthStatus::Healthy
        } else if latency <= self.degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }
}

impl Default for HealthThresholds {
    /// 100ms healthy, 500ms degraded
    fn default() -> Self {
        Self::new(100, 500)
    }
}
