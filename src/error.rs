//! Error types.
//!
//! Nothing in here is ever returned into a host hook frame: hooks swallow
//! and log. These errors surface from setup paths (config, scripts) and from
//! the bus' per-subscriber isolation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[cfg(feature = "relay")]
    #[error("invalid relay configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad script record on line {line}: {source}")]
    Script {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("script line {line}: {reason}")]
    ScriptState { line: usize, reason: String },

    #[error("relay queue closed")]
    RelayClosed,

    #[error("relay queue full (capacity {capacity})")]
    RelayFull { capacity: usize },
}

/// A subscriber that did not complete normally.
///
/// Produced and logged by the bus; it never propagates to the publisher.
#[derive(Debug, Error)]
pub enum SubscriberFailure {
    #[error("handler failed: {0:#}")]
    Failed(anyhow::Error),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
