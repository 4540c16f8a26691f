//! Reconnection events for monitoring

use serde::Serialize;

/// Emitted by the connection manager while it repairs a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconnectEvent {
    /// The current connection failed its probe
    ProbeFailed { alias: String, error: String },
    /// A reconnection attempt is starting
    Attempting {
        alias: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// A reconnection attempt succeeded and the new connection is current
    Succeeded { alias: String, attempts_taken: u32 },
    /// A reconnection attempt failed
    Failed {
        alias: String,
        attempt: u32,
        error: String,
    },
    /// All reconnection attempts exhausted
    Exhausted { alias: String, total_attempts: u32 },
    /// The connection is dead and auto-reconnect is disabled
    Unavailable { alias: String, reason: String },
}

impl ReconnectEvent {
    pub fn alias(&self) -> &str {
        match self {
            ReconnectEvent::ProbeFailed { alias, .. }
            | ReconnectEvent::Attempting { alias, .. }
            | ReconnectEvent::Succeeded { alias, .. }
            | ReconnectEvent::Failed { alias, .. }
            | ReconnectEvent::Exhausted { alias, .. }
            | ReconnectEvent::Unavailable { alias, .. } => alias,
        }
    }
}
