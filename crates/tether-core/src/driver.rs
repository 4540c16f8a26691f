//! Database driver trait definition

use crate::{Connection, ConnectionConfig, PoolPolicy, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A physical database client library
///
/// Drivers turn a [`ConnectionConfig`] into a live, pool-backed
/// [`Connection`]. They know nothing about health caching or reconnection.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "mysql")
    fn name(&self) -> &'static str;

    /// Display name for logs and status output
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Default server port (None for file or socket based databases)
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Open a physical pool for `config` and apply `pool` limits to it.
    ///
    /// Implementations should not treat the returned handle as verified;
    /// callers probe it before handing it out.
    async fn connect(&self, config: &ConnectionConfig, pool: &PoolPolicy)
        -> Result<Arc<dyn Connection>>;

    /// Build the connection descriptor (DSN) for `config`. Performs no I/O.
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;

    /// Like [`build_connection_string`](Self::build_connection_string) but
    /// safe to log.
    fn redacted_connection_string(&self, config: &ConnectionConfig) -> String {
        let mut redacted = config.clone();
        if redacted.password.is_some() {
            redacted.password = Some("***".to_string());
        }
        self.build_connection_string(&redacted)
    }

    /// Connection string format help text
    fn connection_string_help(&self) -> &'static str {
        ""
    }
}
