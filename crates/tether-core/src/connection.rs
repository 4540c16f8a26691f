//! Connection trait

use crate::{QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;

/// Statement used by the default [`Connection::ping`] implementation.
pub const PING_QUERY: &str = "SELECT 1";

/// A live handle onto a (pooled) database link
///
/// Handles are shared as `Arc<dyn Connection>`; every method takes `&self`
/// so one handle can serve many concurrent callers.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mysql")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Lightweight liveness check.
    ///
    /// Drivers with a protocol-level ping should override this; the default
    /// runs [`PING_QUERY`].
    async fn ping(&self) -> Result<()> {
        self.query(PING_QUERY, &[]).await.map(|_| ())
    }

    /// Close the connection (and the pool behind it)
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver_name())
            .field("closed", &self.is_closed())
            .finish()
    }
}
