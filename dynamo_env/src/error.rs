//! Error types for the Dynamo environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// The sink's buffer is full; the message was dropped.
    #[error("Event sink full, dropped message to {0}")]
    SinkFull(String),

    /// The receiving side of the sink is gone.
    #[error("Event sink closed")]
    SinkClosed,
}

impl EnvError {
    /// Creates a sink-full error for the given address.
    pub fn full(address: impl Into<String>) -> Self {
        Self::SinkFull(address.into())
    }
}
