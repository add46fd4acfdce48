//! Error types for the simulation harness.

use dynamo_core::ParamError;
use thiserror::Error;

/// Everything that can go wrong outside the engines themselves.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Unknown model: {0} (expected kinetics, oscillators or diffusion)")]
    UnknownModel(String),

    #[error("Invalid parameter: {0}")]
    Param(#[from] ParamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
