//! Connection manager: cached validation and single-flight reconnection
//!
//! Every database operation asks the manager for a handle. In steady state
//! the handle was validated less than `validity_window` ago and is returned
//! under a read lock without touching the network. Once the window expires,
//! one caller takes the write lock, probes the connection and, if it is dead,
//! replaces it through the [`ConnectionFactory`]. Callers queued behind that
//! caller re-check the state and reuse its outcome, success or failure.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{Connection, ConnectionConfig, PoolPolicy, Result, TetherError};
use tether_drivers::DriverRegistry;
use tokio::sync::{RwLock as AsyncRwLock, broadcast};
use tokio::time::Instant;

use crate::factory::{ConnectionFactory, DriverConnectionFactory};
use crate::health::{HealthStatus, HealthThresholds, ping_database};
use crate::observability::{Observability, ObservabilityHook};
use crate::reconnect::{ReconnectEvent, ReconnectPolicy};
use crate::registry::ConfigRegistry;


/// How long a successful validation is trusted.
pub const DEFAULT_VALIDITY_WINDOW: Duration = Duration::from_secs(30);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Construction options for a [`ConnectionManager`].
#[derive(Clone)]
pub struct ManagerOptions {
    pub reconnect: ReconnectPolicy,
    pub validity_window: Duration,
    pub debug: bool,
    pub hook: Option<Arc<dyn ObservabilityHook>>,
    pub thresholds: HealthThresholds,
}

impl ManagerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_validity_window(mut self, window: Duration) -> Self {
        self.validity_window = window;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ObservabilityHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            validity_window: DEFAULT_VALIDITY_WINDOW,
            debug: false,
            hook: None,
            thresholds: HealthThresholds::default(),
        }
    }
}

impl std::fmt::Debug for ManagerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("reconnect", &self.reconnect)
            .field("validity_window", &self.validity_window)
            .field("debug", &self.debug)
            .field("hook", &self.hook.as_ref().map(|h| h.level()))
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

/// Point-in-time view of a manager, for health endpoints and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerStatus {
    pub alias: String,
    pub connected: bool,
    pub available: bool,
    pub auto_reconnect: bool,
    /// Time since the last successful validation
    pub last_validated: Option<Duration>,
    pub last_latency: Option<Duration>,
    pub health: HealthStatus,
    pub total_reconnects: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
enum FailureKind {
    Unavailable,
    Exhausted { attempts: u32 },
}

/// Outcome of the most recent failed validation
#[derive(Debug, Clone)]
struct Failure {
    at: Instant,
    kind: FailureKind,
    reason: Arc<str>,
}

impl Failure {
    fn to_error(&self) -> TetherError {
        match self.kind {
            FailureKind::Unavailable => TetherError::Unavailable(self.reason.to_string()),
            FailureKind::Exhausted { attempts } => TetherError::RetriesExhausted {
                attempts,
                last_error: self.reason.to_string(),
            },
        }
    }
}

enum Freshness {
    Valid(Arc<dyn Connection>),
    Failed(Failure),
    Stale,
}

#[derive(Default)]
struct ManagerState {
    current: Option<Arc<dyn Connection>>,
    last_validated_at: Option<Instant>,
    last_failure: Option<Failure>,
    last_latency: Option<Duration>,
    total_reconnects: u64,
    consecutive_failures: u32,
}

impl ManagerState {
    fn freshness(&self, now: Instant, window: Duration) -> Freshness {
        let within = |at: Instant| now.saturating_duration_since(at) < window;

        if let Some(failure) = &self.last_failure {
            if within(failure.at) {
                return Freshness::Failed(failure.clone());
            }
        }
        match (&self.current, self.last_validated_at) {
            (Some(conn), Some(at)) if self.last_failure.is_none() && within(at) => {
                Freshness::Valid(conn.clone())
            }
            _ => Freshness::Stale,
        }
    }

    fn mark_validated(&mut self, latency: Option<Duration>) {
        let now = Instant::now();
        if self.last_validated_at.is_none_or(|at| now > at) {
            self.last_validated_at = Some(now);
        }
        self.last_latency = latency;
        self.last_failure = None;
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self, kind: FailureKind, reason: &str) -> Failure {
        let failure = Failure {
            at: Instant::now(),
            kind,
            reason: Arc::from(reason),
        };
        self.last_failure = Some(failure.clone());
        self.consecutive_failures += 1;
        failure
    }
}

/// Close a replaced handle in the background.
///
/// A pool only finishes disconnecting once every borrowed connection is
/// back, so the close runs detached from the caller and is bounded by
/// `timeout`.
fn retire(alias: &str, previous: Arc<dyn Connection>, timeout: Duration) {
    let alias = alias.to_string();
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, previous.close()).await {
            Ok(Ok(())) => tracing::debug!(alias = %alias, "Replaced connection closed"),
            Ok(Err(e)) => {
                tracing::debug!(alias = %alias, error = %e, "Failed to close replaced connection")
            }
            Err(_) => tracing::warn!(
                alias = %alias,
                timeout_ms = timeout.as_millis() as u64,
                "Gave up closing replaced connection"
            ),
        }
    });
}

#[derive(Default)]
struct ObserverSettings {
    debug: bool,
    hook: Option<Arc<dyn ObservabilityHook>>,
}

/// Owns the live connection for one database alias.
pub struct ConnectionManager {
    alias: String,
    factory: Arc<dyn ConnectionFactory>,
    state: AsyncRwLock<ManagerState>,
    policy: RwLock<ReconnectPolicy>,
    observers: RwLock<ObserverSettings>,
    validity_window: Duration,
    thresholds: HealthThresholds,
    events: broadcast::Sender<ReconnectEvent>,
}

impl ConnectionManager {
    /// Validate `config`, open the first connection and publish the
    /// configuration under its alias.
    ///
    /// Any failure is returned to the caller and nothing is published.
    #[tracing::instrument(skip_all, fields(alias = %config.alias, driver = %config.driver))]
    pub async fn configure(
        config: ConnectionConfig,
        pool: PoolPolicy,
        drivers: &DriverRegistry,
        registry: &ConfigRegistry,
        options: ManagerOptions,
    ) -> Result<Self> {
        config.validate()?;

        if registry.contains(&config.alias) {
            return Err(TetherError::Configuration(format!(
                "[{}] alias is already configured",
                config.alias
            )));
        }

        let driver = drivers.get(&config.driver).ok_or_else(|| {
            TetherError::Configuration(format!(
                "[{}] unknown driver '{}' (available: {})",
                config.alias,
                config.driver,
                drivers.list().join(", ")
            ))
        })?;

        let factory = DriverConnectionFactory::new(driver, config.clone(), pool.clone());
        let manager = Self::with_factory(config.alias.clone(), Arc::new(factory), options).await?;

        // A concurrent configure for the same alias may have published first
        if let Err(e) = registry.publish(config, pool) {
            if let Err(close_err) = manager.close().await {
                tracing::debug!(error = %close_err, "Failed to close unpublished connection");
            }
            return Err(e);
        }
        Ok(manager)
    }

    /// Build a manager around any factory and open the first connection.
    pub async fn with_factory(
        alias: impl Into<String>,
        factory: Arc<dyn ConnectionFactory>,
        options: ManagerOptions,
    ) -> Result<Self> {
        let manager = Self::new(alias.into(), factory, options);

        let probe_timeout = manager.policy.read().ping_timeout();
        let conn = manager.factory.open(probe_timeout).await.map_err(|e| {
            tracing::error!(alias = %manager.alias, error = %e, "Initial connection failed");
            e
        })?;

        let mut state = manager.state.write().await;
        state.current = Some(conn);
        state.mark_validated(None);
        drop(state);

        tracing::info!(alias = %manager.alias, factory = %manager.factory.describe(), "Connection manager ready");
        Ok(manager)
    }

    fn new(alias: String, factory: Arc<dyn ConnectionFactory>, options: ManagerOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            alias,
            factory,
            state: AsyncRwLock::new(ManagerState::default()),
            policy: RwLock::new(options.reconnect),
            observers: RwLock::new(ObserverSettings {
                debug: options.debug,
                hook: options.hook,
            }),
            validity_window: options.validity_window,
            thresholds: options.thresholds,
            events,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn validity_window(&self) -> Duration {
        self.validity_window
    }

    /// Get a ready-to-use connection, repairing it first if needed.
    ///
    /// Returns [`TetherError::Unavailable`] when the connection is dead and
    /// auto-reconnect is off, and [`TetherError::RetriesExhausted`] when every
    /// reconnect attempt failed. Either failure is replayed to later callers
    /// until the validity window has passed.
    pub async fn acquire(&self) -> Result<Arc<dyn Connection>> {
        {
            let state = self.state.read().await;
            match state.freshness(Instant::now(), self.validity_window) {
                Freshness::Valid(conn) => return Ok(self.decorate(conn)),
                Freshness::Failed(failure) => return Err(failure.to_error()),
                Freshness::Stale => {}
            }
        }

        self.validate_and_reconnect().await
    }

    #[tracing::instrument(skip(self), fields(alias = %self.alias))]
    async fn validate_and_reconnect(&self) -> Result<Arc<dyn Connection>> {
        let mut state = self.state.write().await;

        // Another caller may have finished while we waited for the lock
        match state.freshness(Instant::now(), self.validity_window) {
            Freshness::Valid(conn) => return Ok(self.decorate(conn)),
            Freshness::Failed(failure) => return Err(failure.to_error()),
            Freshness::Stale => {}
        }

        let policy = self.policy.read().clone();

        let reason = match state.current.clone() {
            Some(conn) => match ping_database(conn.as_ref(), policy.ping_timeout()).await {
                Ok(latency) => {
                    tracing::trace!(latency_ms = latency.as_millis() as u64, "Connection validated");
                    state.mark_validated(Some(latency));
                    return Ok(self.decorate(conn));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Connection probe failed");
                    self.emit(ReconnectEvent::ProbeFailed {
                        alias: self.alias.clone(),
                        error: e.to_string(),
                    });
                    e.to_string()
                }
            },
            None => "no open connection".to_string(),
        };

        if !policy.auto_reconnect() {
            tracing::error!(reason = %reason, "Database unavailable, auto-reconnect is disabled");
            let failure = state.record_failure(FailureKind::Unavailable, &reason);
            self.emit(ReconnectEvent::Unavailable {
                alias: self.alias.clone(),
                reason,
            });
            return Err(failure.to_error());
        }

        match self.reconnect(&policy).await {
            Ok(conn) => {
                let previous = state.current.replace(conn.clone());
                state.mark_validated(None);
                state.total_reconnects += 1;
                drop(state);

                if let Some(previous) = previous {
                    retire(&self.alias, previous, policy.ping_timeout());
                }
                Ok(self.decorate(conn))
            }
            Err(last_error) => {
                let failure = state.record_failure(
                    FailureKind::Exhausted {
                        attempts: policy.max_retries(),
                    },
                    &last_error,
                );
                Err(failure.to_error())
            }
        }
    }

    /// Open a replacement connection, trying up to `max_retries` times.
    async fn reconnect(&self, policy: &ReconnectPolicy) -> std::result::Result<Arc<dyn Connection>, String> {
        let max_attempts = policy.max_retries();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(policy.retry_interval()).await;
            }

            tracing::info!(attempt, max_attempts, "Reconnecting");
            self.emit(ReconnectEvent::Attempting {
                alias: self.alias.clone(),
                attempt,
                max_attempts,
            });

            match self.factory.open(policy.ping_timeout()).await {
                Ok(conn) => {
                    tracing::info!(attempt, "Reconnected");
                    self.emit(ReconnectEvent::Succeeded {
                        alias: self.alias.clone(),
                        attempts_taken: attempt,
                    });
                    return Ok(conn);
                }
                Err(e) => {
                    tracing::warn!(attempt, max_attempts, error = %e, "Reconnect attempt failed");
                    last_error = e.to_string();
                    self.emit(ReconnectEvent::Failed {
                        alias: self.alias.clone(),
                        attempt,
                        error: last_error.clone(),
                    });
                }
            }
        }

        tracing::error!(attempts = max_attempts, error = %last_error, "Reconnect retries exhausted");
        self.emit(ReconnectEvent::Exhausted {
            alias: self.alias.clone(),
            total_attempts: max_attempts,
        });
        Err(last_error)
    }

    fn decorate(&self, conn: Arc<dyn Connection>) -> Arc<dyn Connection> {
        let observers = self.observers.read();
        Observability::resolve(observers.debug, observers.hook.as_ref()).decorate(conn)
    }

    fn emit(&self, event: ReconnectEvent) {
        // No receivers is not an error
        let _ = self.events.send(event);
    }

    /// Install or replace the observability hook.
    ///
    /// Every handle returned from now on, including replacements opened by
    /// a reconnect, is traced through it.
    pub fn attach(&self, hook: Arc<dyn ObservabilityHook>) {
        tracing::debug!(alias = %self.alias, level = %hook.level(), "Observability hook attached");
        self.observers.write().hook = Some(hook);
    }

    /// Remove the observability hook, falling back to the debug flag.
    pub fn detach(&self) -> Option<Arc<dyn ObservabilityHook>> {
        self.observers.write().hook.take()
    }

    pub fn set_debug(&self, debug: bool) {
        self.observers.write().debug = debug;
    }

    /// The tracing mode handles are currently decorated with.
    pub fn observability(&self) -> Observability {
        let observers = self.observers.read();
        Observability::resolve(observers.debug, observers.hook.as_ref())
    }

    pub fn set_max_retries(&self, max_retries: u32) {
        self.policy.write().set_max_retries(max_retries);
    }

    pub fn set_retry_interval(&self, interval: Duration) {
        self.policy.write().set_retry_interval(interval);
    }

    pub fn set_ping_timeout(&self, timeout: Duration) {
        self.policy.write().set_ping_timeout(timeout);
    }

    pub fn enable_auto_reconnect(&self) {
        self.policy.write().set_auto_reconnect(true);
    }

    pub fn disable_auto_reconnect(&self) {
        self.policy.write().set_auto_reconnect(false);
    }

    /// Snapshot of the current policy.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        self.policy.read().clone()
    }

    /// Receive reconnect events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ReconnectEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> ManagerStatus {
        let state = self.state.read().await;
        let now = Instant::now();
        let connected = state.current.is_some();

        let health = HealthStatus::from_state(
            connected,
            state.last_failure.is_some(),
            state.last_latency,
            &self.thresholds,
        );

        ManagerStatus {
            alias: self.alias.clone(),
            connected,
            available: connected && state.last_failure.is_none(),
            auto_reconnect: self.policy.read().auto_reconnect(),
            last_validated: state
                .last_validated_at
                .map(|at| now.saturating_duration_since(at)),
            last_latency: state.last_latency,
            health,
            total_reconnects: state.total_reconnects,
            consecutive_failures: state.consecutive_failures,
            last_error: state.last_failure.as_ref().map(|f| f.reason.to_string()),
        }
    }

    /// Close the current connection.
    ///
    /// The next `acquire` opens a new one if auto-reconnect is enabled.
    #[tracing::instrument(skip(self), fields(alias = %self.alias))]
    pub async fn close(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.write().await;
            state.last_failure = None;
            state.last_latency = None;
            state.current.take()
        };

        if let Some(conn) = previous {
            tracing::info!("Closing connection");
            conn.close().await?;
        }
        Ok(())
    }
}
