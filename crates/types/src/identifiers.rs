//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant identity.
///
/// Identity `0` is the coordinator; workers are numbered from `1` and keep
/// their identity for the lifetime of a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorkerId(pub u32);

impl WorkerId {
    /// The coordinator's identity.
    pub const COORDINATOR: Self = WorkerId(0);

    /// The first worker. Runs the pre-run diagnostics.
    pub const FIRST: Self = WorkerId(1);

    /// Get the raw value.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Whether this identity refers to the coordinator.
    pub fn is_coordinator(&self) -> bool {
        self.0 == 0
    }

    /// Worker identities for a pool of `participants` (coordinator included).
    ///
    /// A pool of one participant has no workers.
    pub fn workers(participants: u32) -> impl Iterator<Item = WorkerId> {
        (1..participants.max(1)).map(WorkerId)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker({})", self.0)
    }
}

/// Per-event induced-current samples, one per time bin.
pub type Waveform = Vec<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_range() {
        let ids: Vec<_> = WorkerId::workers(4).collect();
        assert_eq!(ids, vec![WorkerId(1), WorkerId(2), WorkerId(3)]);
        assert_eq!(WorkerId::workers(1).count(), 0);
        assert_eq!(WorkerId::workers(0).count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkerId(7).to_string(), "Worker(7)");
        assert!(WorkerId::COORDINATOR.is_coordinator());
        assert!(!WorkerId::FIRST.is_coordinator());
    }
}
