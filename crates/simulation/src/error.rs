use arbuckle_core::AbortReason;
use arbuckle_dispatch::WorkerError;
use arbuckle_engine::EngineError;
use arbuckle_output::NpyError;
use arbuckle_types::{ConfigError, WorkerId};
use thiserror::Error;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// A worker returned an error. No task is retried.
    #[error("{worker} failed: {source}")]
    WorkerFailed {
        worker: WorkerId,
        #[source]
        source: WorkerError,
    },

    /// Worker identities are 32-bit.
    #[error("Pool of {0} participants is too large")]
    TooManyParticipants(usize),

    #[error("{0} panicked")]
    WorkerPanicked(WorkerId),

    /// A worker's channel closed while it still had a task.
    #[error("{0} exited without stopping")]
    WorkerLost(WorkerId),

    #[error("Run aborted: {0}")]
    Aborted(#[from] AbortReason),

    #[error("Failed to write outputs: {0}")]
    Output(#[from] NpyError),
}
