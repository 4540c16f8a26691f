//! Subcommand implementations

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tether_connection::{
    ConfigRegistry, ConnectionManager, HealthStatus, ManagerStatus, ReconnectPolicy,
    ResolvedDatabase, ping_database,
};
use tether_core::{ConnectionConfig, PoolPolicy};
use tether_drivers::DriverRegistry;
use tokio::sync::broadcast::error::RecvError;

/// Open every database once and print a status table.
///
/// Returns `false` if any database could not be reached.
pub async fn check(databases: Vec<ResolvedDatabase>) -> Result<bool> {
    let drivers = DriverRegistry::with_defaults();
    let registry = ConfigRegistry::new();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Alias", "Target", "Health", "Latency", "Detail",
    ]);

    let mut all_available = true;
    for database in databases {
        let alias = database.config.alias.clone();
        let target = describe_target(&drivers, &database.config);
        let thresholds = database.options.thresholds.clone();

        let manager = match ConnectionManager::configure(
            database.config,
            database.pool,
            &drivers,
            &registry,
            database.options,
        )
        .await
        {
            Ok(manager) => manager,
            Err(e) => {
                tracing::warn!(alias = %alias, error = %e, "Database unreachable");
                all_available = false;
                table.add_row(vec![
                    Cell::new(&alias),
                    Cell::new(&target),
                    health_cell(HealthStatus::Unhealthy),
                    Cell::new("-"),
                    Cell::new(e.to_string()),
                ]);
                continue;
            }
        };

        let (health, latency, detail) = match manager.acquire().await {
            Ok(conn) => {
                let probe =
                    ping_database(conn.as_ref(), manager.reconnect_policy().ping_timeout()).await;
                let health = HealthStatus::from_probe(&probe, &thresholds);
                match probe {
                    Ok(latency) => (health, Some(latency), "ok".to_string()),
                    Err(e) => (health, None, e.to_string()),
                }
            }
            Err(e) => (HealthStatus::Unhealthy, None, e.to_string()),
        };
        all_available &= health.is_usable();

        table.add_row(vec![
            Cell::new(&alias),
            Cell::new(&target),
            health_cell(health),
            Cell::new(format_latency(latency)),
            Cell::new(detail),
        ]);

        if let Err(e) = manager.close().await {
            tracing::debug!(alias = %alias, error = %e, "Failed to close connection");
        }
    }

    println!("{table}");
    Ok(all_available)
}

/// Keep every database validated until Ctrl-C, logging reconnect events and
/// availability changes.
pub async fn watch(databases: Vec<ResolvedDatabase>, interval: Duration) -> Result<()> {
    let drivers = DriverRegistry::with_defaults();
    let registry = ConfigRegistry::new();

    let mut managers = Vec::with_capacity(databases.len());
    for database in databases {
        let alias = database.config.alias.clone();
        let manager = ConnectionManager::configure(
            database.config,
            database.pool,
            &drivers,
            &registry,
            database.options,
        )
        .await
        .with_context(|| format!("Failed to connect '{}'", alias))?;
        managers.push(Arc::new(manager));
    }

    for manager in &managers {
        let mut events = manager.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => tracing::info!(alias = event.alias(), event = %json, "Reconnect event"),
                        Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event listener fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    tracing::info!(
        databases = managers.len(),
        interval_secs = interval.as_secs(),
        "Watching connections"
    );

    let mut previous: HashMap<String, bool> = HashMap::new();
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for manager in &managers {
                    if let Err(e) = manager.acquire().await {
                        tracing::debug!(alias = manager.alias(), error = %e, "Acquire failed");
                    }
                    let status = manager.status().await;
                    report_transition(&mut previous, &status);
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    for manager in &managers {
        if let Err(e) = manager.close().await {
            tracing::warn!(alias = manager.alias(), error = %e, "Failed to close connection");
        }
    }
    Ok(())
}

fn report_transition(previous: &mut HashMap<String, bool>, status: &ManagerStatus) {
    let was = previous.insert(status.alias.clone(), status.available);
    match (was, status.available) {
        (Some(true), false) | (None, false) => tracing::warn!(
            alias = %status.alias,
            error = status.last_error.as_deref().unwrap_or("unknown"),
            consecutive_failures = status.consecutive_failures,
            "Database unavailable"
        ),
        (Some(false), true) | (None, true) => tracing::info!(
            alias = %status.alias,
            health = %status.health,
            latency_ms = status.last_latency.map(|l| l.as_millis() as u64),
            total_reconnects = status.total_reconnects,
            "Database available"
        ),
        _ => {}
    }
}

/// One database as printed by `show-config`
#[derive(Debug, Serialize)]
pub struct DatabaseView {
    pub alias: String,
    pub driver: String,
    pub target: String,
    pub config: ConnectionConfig,
    pub pool: PoolPolicy,
    pub reconnect: ReconnectPolicy,
    pub validity_window_ms: u64,
    pub debug: bool,
    pub log_level: Option<String>,
}

/// Resolved settings with every password replaced by `***`
pub fn redacted_view(databases: &[ResolvedDatabase]) -> Vec<DatabaseView> {
    let drivers = DriverRegistry::with_defaults();
    databases
        .iter()
        .map(|database| {
            let mut config = database.config.clone();
            if config.password.is_some() {
                config.password = Some("***".to_string());
            }
            DatabaseView {
                alias: config.alias.clone(),
                driver: config.driver.clone(),
                target: describe_target(&drivers, &database.config),
                config,
                pool: database.pool.clone(),
                reconnect: database.options.reconnect.clone(),
                validity_window_ms: database.options.validity_window.as_millis() as u64,
                debug: database.options.debug,
                log_level: database.options.hook.as_ref().map(|h| h.level().to_string()),
            }
        })
        .collect()
}

pub fn show_config(databases: &[ResolvedDatabase]) -> Result<()> {
    let view = redacted_view(databases);
    let json = serde_json::to_string_pretty(&view).context("Failed to encode settings")?;
    println!("{json}");
    Ok(())
}

fn describe_target(drivers: &DriverRegistry, config: &ConnectionConfig) -> String {
    match drivers.get(&config.driver) {
        Some(driver) => driver.redacted_connection_string(config),
        None => format!("<unknown driver '{}'>", config.driver),
    }
}

fn format_latency(latency: Option<Duration>) -> String {
    match latency {
        Some(latency) => format!("{} ms", latency.as_millis()),
        None => "-".to_string(),
    }
}

fn health_cell(health: HealthStatus) -> Cell {
    let color = match health {
        HealthStatus::Healthy => Color::Green,
        HealthStatus::Degraded => Color::Yellow,
        HealthStatus::Unhealthy => Color::Red,
    };
    Cell::new(health.to_string()).fg(color)
}
