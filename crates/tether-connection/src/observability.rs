//! Statement tracing for handles returned by the connection manager
//!
//! The manager never logs statements itself. It decorates each handle it
//! returns according to an [`Observability`] mode resolved from its settings:
//! an attached [`ObservabilityHook`] that is not silenced wins, otherwise the
//! boolean debug flag decides between plain `tracing` debug output and no
//! decoration at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{
    Connection, PING_QUERY, QueryResult, Result, StatementResult, TetherError, Value,
};
use tokio::time::Instant;

/// Statements slower than this are reported as slow unless a hook says otherwise.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(200);

/// Reporting level of a hook. Each level includes the ones before it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Error,
    #[default]
    Warn,
    Info,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Silent => "silent",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
        };
        f.write_str(name)
    }
}

/// Receiver of statement execution events.
pub trait ObservabilityHook: Send + Sync {
    fn record_success(&self, sql: &str, elapsed: Duration, rows_affected: u64);

    fn record_error(&self, sql: &str, elapsed: Duration, error: &TetherError);

    fn record_slow(&self, sql: &str, elapsed: Duration, threshold: Duration);

    fn level(&self) -> LogLevel;

    fn slow_threshold(&self) -> Duration {
        DEFAULT_SLOW_THRESHOLD
    }
}

/// Hook that forwards events to `tracing`.
#[derive(Debug, Clone)]
pub struct TracingHook {
    alias: String,
    level: LogLevel,
    slow_threshold: Duration,
}

impl TracingHook {
    pub fn new(alias: impl Into<String>, level: LogLevel) -> Self {
        Self {
            alias: alias.into(),
            level,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }
}

impl ObservabilityHook for TracingHook {
    fn record_success(&self, sql: &str, elapsed: Duration, rows_affected: u64) {
        tracing::info!(
            alias = %self.alias,
            sql,
            elapsed_ms = elapsed.as_millis() as u64,
            rows_affected,
            "Statement executed"
        );
    }

    fn record_error(&self, sql: &str, elapsed: Duration, error: &TetherError) {
        tracing::error!(
            alias = %self.alias,
            sql,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error,
            "Statement failed"
        );
    }

    fn record_slow(&self, sql: &str, elapsed: Duration, threshold: Duration) {
        tracing::warn!(
            alias = %self.alias,
            sql,
            elapsed_ms = elapsed.as_millis() as u64,
            threshold_ms = threshold.as_millis() as u64,
            "Slow statement"
        );
    }

    fn level(&self) -> LogLevel {
        self.level
    }

    fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }
}

/// How returned handles are traced.
#[derive(Clone, Default)]
pub enum Observability {
    #[default]
    None,
    SimpleDebug,
    Hook(Arc<dyn ObservabilityHook>),
}

impl Observability {
    /// Resolve the mode from the manager's settings.
    ///
    /// A hook governs unless its level is [`LogLevel::Silent`]; in that case,
    /// or with no hook, the debug flag decides.
    pub fn resolve(debug: bool, hook: Option<&Arc<dyn ObservabilityHook>>) -> Self {
        match hook {
            Some(hook) if hook.level() > LogLevel::Silent => Observability::Hook(hook.clone()),
            _ if debug => Observability::SimpleDebug,
            _ => Observability::None,
        }
    }

    /// Wrap `conn` in a [`TracedConnection`] unless tracing is off.
    pub fn decorate(&self, conn: Arc<dyn Connection>) -> Arc<dyn Connection> {
        match self {
            Observability::None => conn,
            _ => Arc::new(TracedConnection::new(conn, self.clone())),
        }
    }
}

impl std::fmt::Debug for Observability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Observability::None => write!(f, "None"),
            Observability::SimpleDebug => write!(f, "SimpleDebug"),
            Observability::Hook(hook) => write!(f, "Hook({})", hook.level()),
        }
    }
}

/// Connection decorator timing every statement.
pub struct TracedConnection {
    inner: Arc<dyn Connection>,
    observability: Observability,
}

impl TracedConnection {
    pub fn new(inner: Arc<dyn Connection>, observability: Observability) -> Self {
        Self {
            inner,
            observability,
        }
    }

    fn report<T>(&self, sql: &str, elapsed: Duration, result: &Result<T>, rows: impl Fn(&T) -> u64) {
        match &self.observability {
            Observability::None => {}
            Observability::SimpleDebug => match result {
                Ok(value) => tracing::debug!(
                    sql,
                    elapsed_ms = elapsed.as_millis() as u64,
                    rows = rows(value),
                    "Statement executed"
                ),
                Err(e) => tracing::debug!(
                    sql,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Statement failed"
                ),
            },
            Observability::Hook(hook) => {
                let level = hook.level();
                match result {
                    Err(e) if level >= LogLevel::Error => hook.record_error(sql, elapsed, e),
                    Err(_) => {}
                    Ok(value) => {
                        let threshold = hook.slow_threshold();
                        if elapsed > threshold {
                            if level >= LogLevel::Warn {
                                hook.record_slow(sql, elapsed, threshold);
                            }
                        } else if level >= LogLevel::Info {
                            hook.record_success(sql, elapsed, rows(value));
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Connection for TracedConnection {
    fn driver_name(&self) -> &str {
        self.inner.driver_name()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let start = Instant::now();
        let result = self.inner.execute(sql, params).await;
        self.report(sql, start.elapsed(), &result, |r| r.affected_rows);
        result
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start = Instant::now();
        let result = self.inner.query(sql, params).await;
        self.report(sql, start.elapsed(), &result, |r| r.row_count() as u64);
        result
    }

    async fn ping(&self) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.ping().await;
        self.report(PING_QUERY, start.elapsed(), &result, |_| 0);
        result
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HookCall, MockConnection, RecordingHook};
    use pretty_assertions::assert_eq;

    fn hook(level: LogLevel) -> (Arc<RecordingHook>, Arc<dyn ObservabilityHook>) {
        let recording = RecordingHook::new(level);
        let dyn_hook: Arc<dyn ObservabilityHook> = recording.clone();
        (recording, dyn_hook)
    }

    #[test]
    fn test_resolve_without_hook_follows_debug_flag() {
        assert!(matches!(Observability::resolve(false, None), Observability::None));
        assert!(matches!(
            Observability::resolve(true, None),
            Observability::SimpleDebug
        ));
    }

    #[test]
    fn test_resolve_active_hook_overrides_debug_flag() {
        let (_, hook) = hook(LogLevel::Error);
        assert!(matches!(
            Observability::resolve(false, Some(&hook)),
            Observability::Hook(_)
        ));
        assert!(matches!(
            Observability::resolve(true, Some(&hook)),
            Observability::Hook(_)
        ));
    }

    #[test]
    fn test_resolve_silent_hook_falls_back_to_debug_flag() {
        let (_, hook) = hook(LogLevel::Silent);
        assert!(matches!(
            Observability::resolve(false, Some(&hook)),
            Observability::None
        ));
        assert!(matches!(
            Observability::resolve(true, Some(&hook)),
            Observability::SimpleDebug
        ));
    }

    #[test]
    fn test_decorate_none_returns_same_handle() {
        let conn: Arc<dyn Connection> = Arc::new(MockConnection::new(1));
        let decorated = Observability::None.decorate(conn.clone());
        assert!(Arc::ptr_eq(&conn, &decorated));
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Silent < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert_eq!(LogLevel::default(), LogLevel::Warn);
    }

    #[test]
    fn test_log_level_deserializes_lowercase() {
        let level: LogLevel = serde_json::from_str("\"info\"").unwrap();
        assert_eq!(level, LogLevel::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn test_info_hook_records_success() {
        let (recording, hook) = hook(LogLevel::Info);
        let conn = Observability::Hook(hook).decorate(Arc::new(MockConnection::new(1)));

        conn.execute("UPDATE users SET active = 1", &[]).await.unwrap();

        assert_eq!(
            recording.calls(),
            vec![HookCall::Success {
                sql: "UPDATE users SET active = 1".into(),
                rows_affected: 2,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_warn_hook_skips_success_but_records_slow() {
        let (recording, hook) = hook(LogLevel::Warn);
        let conn = Observability::Hook(hook).decorate(Arc::new(MockConnection::new(1)));

        conn.execute("UPDATE users SET active = 1", &[]).await.unwrap();
        conn.execute("SELECT SLEEP(1)", &[]).await.unwrap();

        assert_eq!(
            recording.calls(),
            vec![HookCall::Slow {
                sql: "SELECT SLEEP(1)".into(),
                threshold: DEFAULT_SLOW_THRESHOLD,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_hook_records_only_errors() {
        let (recording, hook) = hook(LogLevel::Error);
        let conn = Observability::Hook(hook).decorate(Arc::new(MockConnection::new(1)));

        conn.execute("SELECT SLEEP(1)", &[]).await.unwrap();
        let err = conn.execute("BROKEN STATEMENT", &[]).await.unwrap_err();

        assert_eq!(
            recording.calls(),
            vec![HookCall::Error {
                sql: "BROKEN STATEMENT".into(),
                error: err.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_traced_connection_delegates() {
        let inner = Arc::new(MockConnection::new(7));
        let traced = TracedConnection::new(inner.clone(), Observability::SimpleDebug);

        assert_eq!(traced.driver_name(), "mock");
        traced.query("SELECT 1", &[]).await.unwrap();
        traced.ping().await.unwrap();
        assert_eq!(inner.statements(), 1);
        assert_eq!(inner.pings(), 1);

        traced.close().await.unwrap();
        assert!(inner.is_closed());
        assert!(traced.is_closed());
    }
}
