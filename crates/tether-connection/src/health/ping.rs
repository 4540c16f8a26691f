//! Database ping implementation
//!
//! A probe is the driver's cheapest liveness check, bounded by a timeout so
//! that a hung server is reported as a failure instead of blocking forever.

use std::time::Duration;
use tether_core::Connection;
use tokio::time::Instant;

/// Round-trip time of a successful probe, or why it failed
pub type PingResult = Result<Duration, PingError>;

/// Error that can occur during a ping operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingError {
    /// The connection is closed
    ConnectionClosed,
    /// The driver reported an error
    Failed(String),
    /// No answer within the timeout
    Timeout(Duration),
}

impl std::fmt::Display for PingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PingError::ConnectionClosed => write!(f, "Connection is closed"),
            PingError::Failed(msg) => write!(f, "Ping failed: {}", msg),
            PingError::Timeout(timeout) => write!(f, "Ping timed out after {:?}", timeout),
        }
    }
}

impl std::error::Error for PingError {}

impl From<PingError> for tether_core::TetherError {
    fn from(err: PingError) -> Self {
        match err {
            PingError::Timeout(_) => tether_core::TetherError::Timeout(err.to_string()),
            _ => tether_core::TetherError::Connection(err.to_string()),
        }
    }
}

/// Ping a database connection to check if it's alive.
///
/// Returns the round-trip time when the driver answers within `timeout`.
pub async fn ping_database(conn: &dyn Connection, timeout: Duration) -> PingResult {
    if conn.is_closed() {
        return Err(PingError::ConnectionClosed);
    }

    let start = Instant::now();
    match tokio::time::timeout(timeout, conn.ping()).await {
        Ok(Ok(())) => Ok(start.elapsed()),
        Ok(Err(e)) => Err(PingError::Failed(e.to_string())),
        Err(_) => Err(PingError::Timeout(timeout)),
    }
}
