//! Opening probed physical connections

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    Connection, ConnectionConfig, DatabaseDriver, PoolPolicy, Result, TetherError,
};

use crate::health::{PingError, ping_database};
use crate::reconnect::BackoffStrategy;

/// Extra probes after the first one fails.
pub const PROBE_RETRIES: u32 = 3;

/// Produces live, validated connections.
///
/// The manager calls this at startup and whenever the current connection
/// has to be replaced. An implementation must only return a handle that
/// answered a probe.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open a new connection, probing it with `probe_timeout` per attempt.
    async fn open(&self, probe_timeout: Duration) -> Result<Arc<dyn Connection>>;

    /// Human readable target, safe to log.
    fn describe(&self) -> String;
}

/// Factory backed by a [`DatabaseDriver`].
///
/// Each `open` builds the pool through the driver, then probes it. A failed
/// probe is retried [`PROBE_RETRIES`] times with an escalating pause
/// (200ms, 400ms, 800ms). If every probe fails the half-open pool is closed
/// and the last probe error is returned.
pub struct DriverConnectionFactory {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
    pool: PoolPolicy,
    backoff: BackoffStrategy,
    probe_retries: u32,
}

impl DriverConnectionFactory {
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig, pool: PoolPolicy) -> Self {
        Self {
            driver,
            config,
            pool,
            backoff: BackoffStrategy::default(),
            probe_retries: PROBE_RETRIES,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_probe_retries(mut self, retries: u32) -> Self {
        self.probe_retries = retries;
        self
    }

    async fn probe_with_retries(
        &self,
        conn: &dyn Connection,
        probe_timeout: Duration,
    ) -> std::result::Result<Duration, PingError> {
        let mut attempt = 0;
        loop {
            match ping_database(conn, probe_timeout).await {
                Ok(latency) => return Ok(latency),
                Err(PingError::ConnectionClosed) => return Err(PingError::ConnectionClosed),
                Err(e) if attempt >= self.probe_retries => return Err(e),
                Err(e) => {
                    let delay = self.backoff.calculate_delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        alias = %self.config.alias,
                        attempt,
                        max_retries = self.probe_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Connection probe failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ConnectionFactory for DriverConnectionFactory {
    #[tracing::instrument(skip(self), fields(alias = %self.config.alias, driver = self.driver.name()))]
    async fn open(&self, probe_timeout: Duration) -> Result<Arc<dyn Connection>> {
        tracing::debug!(
            dsn = %self.driver.redacted_connection_string(&self.config),
            "Opening connection"
        );

        let conn = self.driver.connect(&self.config, &self.pool).await?;

        match self.probe_with_retries(conn.as_ref(), probe_timeout).await {
            Ok(latency) => {
                tracing::info!(
                    latency_ms = latency.as_millis() as u64,
                    "Connection established"
                );
                Ok(conn)
            }
            Err(probe_error) => {
                if let Err(e) = conn.close().await {
                    tracing::debug!(error = %e, "Failed to close unreachable connection");
                }
                tracing::error!(error = %probe_error, "Connection probe retries exhausted");
                Err(TetherError::Connection(format!(
                    "[{}] {} unreachable: {}",
                    self.config.alias,
                    self.describe(),
                    probe_error
                )))
            }
        }
    }

    fn describe(&self) -> String {
        self.driver.redacted_connection_string(&self.config)
    }
}
