//! Error types for Tether

use thiserror::Error;

/// Core error type for Tether operations
#[derive(Error, Debug)]
pub enum TetherError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// No usable connection could be handed out.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Every reconnect attempt failed.
    #[error("Reconnect retries exhausted after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TetherError {
    /// Whether the error describes a reachability problem that a reconnect
    /// could plausibly fix.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            TetherError::Connection(_)
                | TetherError::Timeout(_)
                | TetherError::Io(_)
                | TetherError::Unavailable(_)
                | TetherError::RetriesExhausted { .. }
        )
    }
}

/// Result type alias for Tether operations
pub type Result<T> = std::result::Result<T, TetherError>;
