//! Runtime reconnect policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest wait between reconnect attempts.
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Smallest timeout allowed for a single probe.
pub const MIN_PING_TIMEOUT: Duration = Duration::from_secs(1);

/// How the connection manager reacts to a dead connection.
///
/// Every setter clamps its input, so a policy can never end up retrying
/// without waiting or probing with a zero timeout. Out-of-range values are
/// raised to the floor rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReconnectSettings", into = "ReconnectSettings")]
pub struct ReconnectPolicy {
    max_retries: u32,
    retry_interval: Duration,
    ping_timeout: Duration,
    auto_reconnect: bool,
}

impl ReconnectPolicy {
    pub fn new(max_retries: u32, retry_interval: Duration, ping_timeout: Duration) -> Self {
        let mut policy = Self::default();
        policy.set_max_retries(max_retries);
        policy.set_retry_interval(retry_interval);
        policy.set_ping_timeout(ping_timeout);
        policy
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the number of reconnect attempts per failure (at least 1).
    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries.max(1);
    }

    /// Set the pause between reconnect attempts (at least 1s).
    pub fn set_retry_interval(&mut self, interval: Duration) {
        self.retry_interval = interval.max(MIN_RETRY_INTERVAL);
    }

    /// Set the timeout for one probe (at least 1s).
    pub fn set_ping_timeout(&mut self, timeout: Duration) {
        self.ping_timeout = timeout.max(MIN_PING_TIMEOUT);
    }

    pub fn set_auto_reconnect(&mut self, enabled: bool) {
        self.auto_reconnect = enabled;
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn ping_timeout(&self) -> Duration {
        self.ping_timeout
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }
}

impl Default for ReconnectPolicy {
    /// 3 retries, 1s apart, 3s probe timeout, auto-reconnect on
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_interval: MIN_RETRY_INTERVAL,
            ping_timeout: Duration::from_secs(3),
            auto_reconnect: true,
        }
    }
}

/// Serialized form, in milliseconds. Converting back applies the clamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ReconnectSettings {
    max_retries: u32,
    retry_interval_ms: u64,
    ping_timeout_ms: u64,
    auto_reconnect: bool,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        ReconnectPolicy::default().into()
    }
}

impl From<ReconnectSettings> for ReconnectPolicy {
    fn from(settings: ReconnectSettings) -> Self {
        ReconnectPolicy::new(
            settings.max_retries,
            Duration::from_millis(settings.retry_interval_ms),
            Duration::from_millis(settings.ping_timeout_ms),
        )
        .with_auto_reconnect(settings.auto_reconnect)
    }
}

impl From<ReconnectPolicy> for ReconnectSettings {
    fn from(policy: ReconnectPolicy) -> Self {
        Self {
            max_retries: policy.max_retries,
            retry_interval_ms: policy.retry_interval.as_millis() as u64,
            ping_timeout_ms: policy.ping_timeout.as_millis() as u64,
            auto_reconnect: policy.auto_reconnect,
        }
    }
}
