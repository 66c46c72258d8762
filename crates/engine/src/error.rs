//! Error types for engine adapters.

use arbuckle_types::ConfigError;
use thiserror::Error;

/// Errors from a simulation engine. All of them end the run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be set up for this run.
    #[error("Engine setup failed: {0}")]
    Setup(String),

    /// Simulating an event failed.
    #[error("Event computation failed: {0}")]
    Compute(String),

    /// Producing diagnostic artifacts failed.
    #[error("Diagnostics failed: {0}")]
    Diagnostics(String),

    /// The run configuration is unusable by this engine.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
