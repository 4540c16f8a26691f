//! Connection and pool configuration
//!
//! Both types are plain data: they are built once (usually from settings),
//! validated, and then shared immutably by the connection manager.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Result, TetherError};

/// Alias used when a configuration does not name one.
pub const DEFAULT_ALIAS: &str = "default";

/// How the client reaches the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    #[default]
    Tcp,
    /// Local socket; `host` holds the socket path
    Unix,
}

impl std::fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportProtocol::Tcp => write!(f, "tcp"),
            TransportProtocol::Unix => write!(f, "unix"),
        }
    }
}

/// Describes how to reach one database
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Namespace of this configuration within the process
    pub alias: String,
    /// Driver ID (e.g., "mysql")
    pub driver: String,
    pub host: String,
    /// Port number (0 = driver default)
    pub port: u16,
    pub protocol: TransportProtocol,
    pub username: String,
    pub password: Option<String>,
    /// Schema / database name
    pub database: String,
    pub charset: String,
    /// Prefix prepended to derived table names
    pub table_prefix: String,
    /// Use singular table names instead of pluralised ones
    pub singular_table: bool,
    /// Create foreign-key constraints when migrating
    pub fk_constraints_on_migrate: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
            driver: "mysql".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            protocol: TransportProtocol::Tcp,
            username: String::new(),
            password: None,
            database: String::new(),
            charset: "utf8mb4".to_string(),
            table_prefix: String::new(),
            singular_table: false,
            fk_constraints_on_migrate: true,
        }
    }
}

impl ConnectionConfig {
    /// Create a MySQL configuration
    pub fn new_mysql(host: &str, port: u16, database: &str, username: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            database: database.to_string(),
            username: username.to_string(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_protocol(mut self, protocol: TransportProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = prefix.to_string();
        self
    }

    /// Port to dial, falling back to the driver's default
    pub fn port_or(&self, default_port: u16) -> u16 {
        if self.port > 0 { self.port } else { default_port }
    }

    /// Reject configurations that can never produce a connection.
    pub fn validate(&self) -> Result<()> {
        if self.alias.trim().is_empty() {
            return Err(TetherError::Configuration("alias must not be empty".into()));
        }
        if self.driver.trim().is_empty() {
            return Err(TetherError::Configuration(format!(
                "[{}] driver must not be empty",
                self.alias
            )));
        }
        if self.host.trim().is_empty() {
            let what = match self.protocol {
                TransportProtocol::Tcp => "host",
                TransportProtocol::Unix => "socket path",
            };
            return Err(TetherError::Configuration(format!(
                "[{}] {} must not be empty",
                self.alias, what
            )));
        }
        if self.database.trim().is_empty() {
            return Err(TetherError::Configuration(format!(
                "[{}] database name must not be empty",
                self.alias
            )));
        }
        if self.username.trim().is_empty() {
            return Err(TetherError::Configuration(format!(
                "[{}] username must not be empty",
                self.alias
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("alias", &self.alias)
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("table_prefix", &self.table_prefix)
            .field("singular_table", &self.singular_table)
            .field("fk_constraints_on_migrate", &self.fk_constraints_on_migrate)
            .finish()
    }
}

/// Limits applied to the physical pool when it is created
///
/// Changing a policy has no effect on a pool that already exists; the pool
/// has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolPolicy {
    max_open: usize,
    max_idle: usize,
    max_lifetime_ms: u64,
    max_idle_time_ms: u64,
}

impl PoolPolicy {
    /// Create a policy with the given open/idle limits and default durations.
    ///
    /// `max_open` is raised to at least 1 and `max_idle` is capped at
    /// `max_open`.
    pub fn new(max_open: usize, max_idle: usize) -> Self {
        let max_open = max_open.max(1);
        Self {
            max_open,
            max_idle: max_idle.min(max_open),
            max_lifetime_ms: 3_600_000, // 1 hour
            max_idle_time_ms: 600_000,  // 10 minutes
        }
    }

    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime_ms = lifetime.as_millis() as u64;
        self
    }

    pub fn with_max_idle_time(mut self, idle: Duration) -> Self {
        self.max_idle_time_ms = idle.as_millis() as u64;
        self
    }

    pub fn max_open(&self) -> usize {
        self.max_open.max(1)
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle.min(self.max_open())
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_lifetime_ms)
    }

    pub fn max_idle_time(&self) -> Duration {
        Duration::from_millis(self.max_idle_time_ms)
    }
}

impl Default for PoolPolicy {
    /// Defaults: 10 open, 5 idle, 1 hour lifetime, 10 minutes idle time
    fn default() -> Self {
        Self::new(10, 5)
    }
}
