//! Resolved database configurations, published by alias

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tether_core::{ConnectionConfig, PoolPolicy, Result, TetherError};

/// A configuration as published by a successfully built connection manager.
#[derive(Debug, Clone)]
pub struct PublishedConfig {
    pub config: ConnectionConfig,
    pub pool: PoolPolicy,
}

/// Write-once-per-alias registry of resolved configurations.
///
/// Owned by the application's composition root and shared as
/// `Arc<ConfigRegistry>` with the components that need to look up a named
/// database (for example to read its table prefix). Entries live as long as
/// the registry and cannot be replaced.
#[derive(Debug, Default)]
pub struct ConfigRegistry {
    entries: RwLock<HashMap<String, Arc<PublishedConfig>>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the configuration for `config.alias`.
    ///
    /// Fails with a configuration error if the alias was already published.
    pub fn publish(&self, config: ConnectionConfig, pool: PoolPolicy) -> Result<Arc<PublishedConfig>> {
        let mut entries = self.entries.write();
        if entries.contains_key(&config.alias) {
            return Err(TetherError::Configuration(format!(
                "[{}] configuration already published",
                config.alias
            )));
        }

        let alias = config.alias.clone();
        let published = Arc::new(PublishedConfig { config, pool });
        entries.insert(alias.clone(), published.clone());
        tracing::debug!(alias = %alias, "Configuration published");
        Ok(published)
    }

    pub fn get(&self, alias: &str) -> Option<Arc<PublishedConfig>> {
        self.entries.read().get(alias).cloned()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.read().contains_key(alias)
    }

    /// Published aliases, sorted
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.entries.read().keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
