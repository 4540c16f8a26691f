//! Test doubles shared by the unit tests of this crate

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tether_core::{
    Connection, ConnectionConfig, DatabaseDriver, PoolPolicy, QueryResult, Result,
    StatementResult, TetherError, Value,
};

use crate::factory::ConnectionFactory;
use crate::observability::{LogLevel, ObservabilityHook};

/// Connection whose liveness is controlled by the test
pub struct MockConnection {
    pub id: u32,
    alive: AtomicBool,
    closed: AtomicBool,
    failing_pings: AtomicU32,
    ping_delay: Option<Duration>,
    pings: AtomicU32,
    statements: AtomicU32,
    hang_on_close: bool,
    close_calls: AtomicU32,
}

impl MockConnection {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            failing_pings: AtomicU32::new(0),
            ping_delay: None,
            pings: AtomicU32::new(0),
            statements: AtomicU32::new(0),
            hang_on_close: false,
            close_calls: AtomicU32::new(0),
        }
    }

    /// `close` never completes, like a pool waiting for a stuck borrower
    pub fn with_hanging_close(mut self) -> Self {
        self.hang_on_close = true;
        self
    }

    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn with_failing_pings(self, count: u32) -> Self {
        self.failing_pings.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_ping_delay(mut self, delay: Option<Duration>) -> Self {
        self.ping_delay = delay;
        self
    }

    /// Make every following ping and statement fail
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> u32 {
        self.statements.load(Ordering::SeqCst)
    }

    fn check_alive(&self) -> Result<()> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TetherError::Connection("server has gone away".into()))
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.statements.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;
        if sql.contains("BROKEN") {
            return Err(TetherError::Query(format!("syntax error near '{}'", sql)));
        }
        if sql.contains("SLEEP") {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Ok(StatementResult {
            affected_rows: 2,
            last_insert_id: None,
        })
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.statements.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;
        Ok(QueryResult::empty())
    }

    async fn ping(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.ping_delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failing_pings.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_pings.store(remaining - 1, Ordering::SeqCst);
            return Err(TetherError::Connection("server has gone away".into()));
        }
        self.check_alive()
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Factory handing out [`MockConnection`]s, optionally failing some opens
pub struct MockFactory {
    opens: AtomicU32,
    failing_opens: AtomicU32,
    open_delay: Mutex<Option<Duration>>,
    created: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            opens: AtomicU32::new(0),
            failing_opens: AtomicU32::new(0),
            open_delay: Mutex::new(None),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `count` opens
    pub fn fail_next(&self, count: u32) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock() = Some(delay);
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn connection(&self, index: usize) -> Arc<MockConnection> {
        self.created.lock()[index].clone()
    }

    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.created.lock().last().cloned()
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    async fn open(&self, _probe_timeout: Duration) -> Result<Arc<dyn Connection>> {
        let id = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.open_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.failing_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(TetherError::Connection(format!(
                "connection refused (attempt {})",
                id
            )));
        }

        let conn = Arc::new(MockConnection::new(id));
        self.created.lock().push(conn.clone());
        Ok(conn)
    }

    fn describe(&self) -> String {
        "mock://test".into()
    }
}

/// Driver producing [`MockConnection`]s for `DriverConnectionFactory` tests
pub struct MockDriver {
    pub connects: AtomicU32,
    failing_pings: u32,
    ping_delay: Option<Duration>,
    refusals: AtomicU32,
    unreachable_connects: AtomicU32,
    created: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            connects: AtomicU32::new(0),
            failing_pings: 0,
            ping_delay: None,
            refusals: AtomicU32::new(0),
            unreachable_connects: AtomicU32::new(0),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Each new connection fails its first `count` pings
    pub fn failing_probes(mut self, count: u32) -> Self {
        self.failing_pings = count;
        self
    }

    pub fn with_ping_delay(mut self, delay: Duration) -> Self {
        self.ping_delay = Some(delay);
        self
    }

    pub fn refusing_connects(self) -> Self {
        self.refuse_next(u32::MAX);
        self
    }

    /// Refuse the next `count` connects
    pub fn refuse_next(&self, count: u32) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    /// The next `count` connects succeed but every probe of those
    /// connections fails
    pub fn unreachable_next(&self, count: u32) {
        self.unreachable_connects.store(count, Ordering::SeqCst);
    }

    pub fn connection(&self, index: usize) -> Arc<MockConnection> {
        self.created.lock()[index].clone()
    }

    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.created.lock().last().cloned()
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(
        &self,
        config: &ConnectionConfig,
        _pool: &PoolPolicy,
    ) -> Result<Arc<dyn Connection>> {
        let id = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        let remaining = self.refusals.load(Ordering::SeqCst);
        if remaining > 0 {
            self.refusals.store(remaining - 1, Ordering::SeqCst);
            return Err(TetherError::Connection(format!(
                "unknown host {}",
                config.host
            )));
        }
        let unreachable = self.unreachable_connects.load(Ordering::SeqCst);
        let failing_pings = if unreachable > 0 {
            self.unreachable_connects.store(unreachable - 1, Ordering::SeqCst);
            u32::MAX
        } else {
            self.failing_pings
        };
        let conn = Arc::new(
            MockConnection::new(id)
                .with_failing_pings(failing_pings)
                .with_ping_delay(self.ping_delay),
        );
        self.created.lock().push(conn.clone());
        Ok(conn)
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        format!(
            "mock://{}:{}@{}/{}",
            config.username,
            config.password.as_deref().unwrap_or(""),
            config.host,
            config.database
        )
    }
}

/// One call received by [`RecordingHook`]
#[derive(Debug, Clone, PartialEq)]
pub enum HookCall {
    Success { sql: String, rows_affected: u64 },
    Error { sql: String, error: String },
    Slow { sql: String, threshold: Duration },
}

/// Hook that remembers every call it receives
pub struct RecordingHook {
    level: LogLevel,
    slow_threshold: Duration,
    calls: Mutex<Vec<HookCall>>,
}

impl RecordingHook {
    pub fn new(level: LogLevel) -> Arc<Self> {
        Self::with_slow_threshold(level, Duration::from_millis(200))
    }

    pub fn with_slow_threshold(level: LogLevel, slow_threshold: Duration) -> Arc<Self> {
        Arc::new(Self {
            level,
            slow_threshold,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().clone()
    }
}

impl ObservabilityHook for RecordingHook {
    fn record_success(&self, sql: &str, _elapsed: Duration, rows_affected: u64) {
        self.calls.lock().push(HookCall::Success {
            sql: sql.to_string(),
            rows_affected,
        });
    }

    fn record_error(&self, sql: &str, _elapsed: Duration, error: &TetherError) {
        self.calls.lock().push(HookCall::Error {
            sql: sql.to_string(),
            error: error.to_string(),
        });
    }

    fn record_slow(&self, sql: &str, _elapsed: Duration, threshold: Duration) {
        self.calls.lock().push(HookCall::Slow {
            sql: sql.to_string(),
            threshold,
        });
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }
}
