//! Inputs to the dispatcher.

use arbuckle_types::{Waveform, WorkerId};

/// Events delivered to the dispatcher by its runner.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Begin the run: fan out the initial tasks.
    Start,

    /// A worker finished an event.
    ResultReceived { from: WorkerId, waveform: Waveform },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Start => "Start",
            Event::ResultReceived { .. } => "ResultReceived",
        }
    }
}
