//! Driver registry for resolving a configuration's driver name

use std::collections::HashMap;
use std::sync::Arc;
use tether_core::DatabaseDriver;

/// Registry of available database drivers
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "mysql")]
        {
            let mysql: Arc<dyn DatabaseDriver> = Arc::new(crate::mysql::MySqlDriver::new());
            registry.register(mysql.clone());
            registry.register_alias("mariadb", mysql);
        }

        registry
    }

    /// Register a new driver under its own name
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::info!(driver = %name, "registering database driver");
        self.drivers.insert(name, driver);
    }

    /// Register a driver under an additional name
    pub fn register_alias(&mut self, alias: &str, driver: Arc<dyn DatabaseDriver>) {
        tracing::debug!(alias = %alias, driver = %driver.name(), "registering driver alias");
        self.drivers.insert(alias.to_string(), driver);
    }

    /// Get a driver by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let driver = self.drivers.get(&name.to_lowercase()).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// List all registered driver names
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Check if a driver is registered
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(&name.to_lowercase())
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
