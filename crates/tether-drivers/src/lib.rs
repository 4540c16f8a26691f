//! Tether Drivers - Database driver implementations
//!
//! This crate collects the concrete drivers implementing the traits in
//! `tether-core` and resolves them by name.

#[cfg(feature = "mysql")]
pub use tether_driver_mysql as mysql;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from tether-core
pub use tether_core::{
    Connection, ConnectionConfig, DatabaseDriver, PoolPolicy, QueryResult, Result, Row,
    StatementResult, TetherError, Value,
};
