//! Unit of work sent to a worker.

use serde::{Deserialize, Serialize};

/// One event to simulate.
///
/// Carries no simulation parameters; those come from the shared run
/// configuration. Exactly one task per run is marked final.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// The recipient also emits end-of-run diagnostics after computing it.
    pub final_event: bool,
}

impl Task {
    pub fn is_final(&self) -> bool {
        self.final_event
    }
}
