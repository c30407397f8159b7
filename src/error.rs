//! Error types for portguard.
//!
//! Only initialization errors are fatal. Lookup and command failures are
//! reported to the reconciler, which logs them and heals on the next cycle.

use crate::graph::PortId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The audio graph client could not be opened.
    #[error("failed to open audio graph client '{name}': {reason}")]
    ClientOpen { name: String, reason: String },

    /// The client could not be activated or deactivated.
    #[error("client activation failed: {0}")]
    Activation(String),

    /// A port name or id did not resolve at the moment of use.
    #[error("port not found: {0}")]
    PortNotFound(String),

    /// No free slot was available in the handoff queue.
    #[error("handoff queue full, port {0} not queued")]
    QueueFull(PortId),

    /// The handoff queue was closed for shutdown.
    #[error("handoff queue closed")]
    QueueClosed,

    /// The audio graph service thread has gone away.
    #[error("audio graph service disconnected")]
    Disconnected,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
