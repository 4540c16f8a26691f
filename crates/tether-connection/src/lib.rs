//! Tether Connection - Resilient connection lifecycle management
//!
//! This crate keeps one live connection per database alias:
//!
//! - `ConnectionFactory` - Opens probed connections (`DriverConnectionFactory` for real drivers)
//! - `ConnectionManager` - Cached validation, single-flight reconnection, observability wiring
//! - `ReconnectPolicy` - Runtime-tunable retry behaviour with clamped setters
//! - `ConfigRegistry` - Resolved configurations published by alias
//! - `Settings` - TOML/JSON settings file loading

pub mod factory;
pub mod health;
mod manager;
pub mod observability;
pub mod reconnect;
mod registry;
pub mod settings;

#[cfg(test)]
mod testing;

pub use factory::{ConnectionFactory, DriverConnectionFactory, PROBE_RETRIES};
pub use health::{HealthStatus, HealthThresholds, PingError, PingResult, ping_database};
pub use manager::{ConnectionManager, DEFAULT_VALIDITY_WINDOW, ManagerOptions, ManagerStatus};
pub use observability::{LogLevel, Observability, ObservabilityHook, TracedConnection, TracingHook};
pub use reconnect::{BackoffStrategy, ReconnectEvent, ReconnectPolicy};
pub use registry::{ConfigRegistry, PublishedConfig};
pub use settings::{ResolvedDatabase, Settings, default_settings_path};
