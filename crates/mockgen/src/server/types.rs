//! Type definitions for the mock server.

use serde::Serialize;

/// Lifecycle state of a server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Listening,
    Stopped,
}

/// Errors starting the server. Every variant is fatal to startup.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("No free port after {attempts} attempts starting at {start}")]
    PortsExhausted { start: u16, attempts: u16 },
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
