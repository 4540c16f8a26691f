//! Database settings file
//!
//! One table per alias:
//!
//! ```toml
//! [databases.default]
//! host = "127.0.0.1"
//! port = 3306
//! username = "app"
//! database = "app"
//!
//! [databases.default.pool]
//! max_open = 10
//!
//! [databases.default.reconnect]
//! retry_interval_ms = 2000
//!
//! [databases.default.observability]
//! log_level = "warn"
//! ```
//!
//! A password can be left out of the file and supplied through
//! `TETHER_<ALIAS>_PASSWORD`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{ConnectionConfig, PoolPolicy, Result, TetherError};

use crate::manager::{DEFAULT_VALIDITY_WINDOW, ManagerOptions};
use crate::observability::{DEFAULT_SLOW_THRESHOLD, LogLevel, TracingHook};
use crate::reconnect::ReconnectPolicy;

/// Name of the settings file inside the config directory
pub const SETTINGS_FILE_NAME: &str = "tether.toml";

/// `~/.config/tether/tether.toml` or the platform equivalent
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tether").join(SETTINGS_FILE_NAME))
}

/// Environment variable holding the password for `alias`
pub fn password_env_var(alias: &str) -> String {
    let alias: String = alias
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("TETHER_{}_PASSWORD", alias)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub databases: BTreeMap<String, DatabaseSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    pub pool: PoolPolicy,
    pub reconnect: ReconnectPolicy,
    pub observability: ObservabilitySettings,
    pub validity_window_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            pool: PoolPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            observability: ObservabilitySettings::default(),
            validity_window_ms: DEFAULT_VALIDITY_WINDOW.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Trace every statement at debug level when no hook is active
    pub debug: bool,
    /// Install a `tracing` hook at this level
    pub log_level: Option<LogLevel>,
    pub slow_threshold_ms: u64,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: None,
            slow_threshold_ms: DEFAULT_SLOW_THRESHOLD.as_millis() as u64,
        }
    }
}

/// Everything needed to configure one connection manager
#[derive(Debug, Clone)]
pub struct ResolvedDatabase {
    pub config: ConnectionConfig,
    pub pool: PoolPolicy,
    pub options: ManagerOptions,
}

impl Settings {
    /// Load settings from `path`; `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Self::from_toml_str(&content).map_err(|e| {
                TetherError::Configuration(format!("{}: {}", path.display(), e))
            })
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TetherError::Configuration(e.to_string()))
    }

    /// Resolve every database, reading password overrides from the process
    /// environment.
    pub fn resolve(&self) -> Result<Vec<ResolvedDatabase>> {
        self.resolve_with_env(|name| std::env::var(name).ok())
    }

    /// Resolve every database with a custom environment lookup.
    ///
    /// Fails on the first invalid configuration.
    pub fn resolve_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<ResolvedDatabase>> {
        self.databases
            .iter()
            .map(|(alias, database)| database.resolve(alias, &env))
            .collect()
    }
}

impl DatabaseSettings {
    fn resolve(
        &self,
        alias: &str,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedDatabase> {
        let mut config = self.connection.clone();
        config.alias = alias.to_string();
        if let Some(password) = env(&password_env_var(alias)) {
            config.password = Some(password);
        }
        config.validate()?;

        let mut options = ManagerOptions::new()
            .with_reconnect(self.reconnect.clone())
            .with_validity_window(Duration::from_millis(self.validity_window_ms.max(1)))
            .with_debug(self.observability.debug);
        if let Some(level) = self.observability.log_level {
            let hook = TracingHook::new(alias, level).with_slow_threshold(Duration::from_millis(
                self.observability.slow_threshold_ms,
            ));
            options = options.with_hook(Arc::new(hook));
        }

        Ok(ResolvedDatabase {
            config,
            pool: self.pool.clone(),
            options,
        })
    }
}
