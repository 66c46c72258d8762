//! Outputs from the dispatcher.

use arbuckle_messages::Message;
use arbuckle_types::WorkerId;
use thiserror::Error;

/// Why a run cannot continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    /// A waveform did not have the run's fixed number of time bins.
    #[error("{worker} returned {found} samples, expected {expected}")]
    WaveformLength {
        worker: WorkerId,
        expected: usize,
        found: usize,
    },

    /// A result arrived from a participant that has no task outstanding.
    #[error("Unexpected result from {0}")]
    UnexpectedResult(WorkerId),
}

/// Actions the runner performs on behalf of the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Deliver a message to one participant.
    Send { to: WorkerId, message: Message },

    /// Every participant has stopped; write the final aggregates.
    Persist,

    /// Tear the run down.
    Abort(AbortReason),
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Send { .. } => "Send",
            Action::Persist => "Persist",
            Action::Abort(_) => "Abort",
        }
    }
}
