//! Tether Core - Core abstractions shared by drivers and the connection layer
//!
//! This crate defines:
//!
//! - `DatabaseDriver` - Trait for physical client implementations
//! - `Connection` - Trait for a live, pool-backed database handle
//! - `ConnectionConfig` / `PoolPolicy` - How to reach a database and how to size its pool
//! - Common types like `Value`, `Row`, `QueryResult`
//! - `TetherError` and the crate-wide `Result`

mod config;
mod connection;
mod driver;
mod error;
mod types;

pub use config::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use types::*;
