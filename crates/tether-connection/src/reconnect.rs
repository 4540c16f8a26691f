//! Reconnect policy, probe backoff and reconnection events
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tether_connection::reconnect::ReconnectPolicy;
//!
//! let mut policy = ReconnectPolicy::default();
//! policy.set_retry_interval(Duration::from_millis(500));
//! assert_eq!(policy.retry_interval(), Duration::from_secs(1));
//! ```

mod backoff;
mod events;
mod policy;

#[cfg(test)]
mod tests;

pub use backoff::BackoffStrategy;
pub use events::ReconnectEvent;
pub use policy::{MIN_PING_TIMEOUT, MIN_RETRY_INTERVAL, ReconnectPolicy};
