//! Liveness probing and latency classification
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tether_connection::health::{HealthStatus, HealthThresholds, ping_database};
//!
//! let probe = ping_database(connection.as_ref(), Duration::from_secs(3)).await;
//! let status = HealthStatus::from_probe(&probe, &HealthThresholds::default());
//! ```

mod ping;
mod status;

#[cfg(test)]
mod tests;

pub use ping::{PingError, PingResult, ping_database};
pub use status::{HealthStatus, HealthThresholds};
