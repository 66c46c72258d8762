use arbuckle_dispatch::Accumulator;
use arbuckle_types::WorkerId;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Final aggregates.
    pub accumulator: Accumulator,

    /// Name of the strategy that ran.
    pub strategy: &'static str,

    /// Pool size, coordinator included.
    pub participants: usize,

    /// Tasks completed by each worker.
    pub completions: BTreeMap<WorkerId, u64>,

    /// Worker that received the final marker, if any task was sent.
    pub final_recipient: Option<WorkerId>,

    pub elapsed: Duration,

    /// Files written by [`persist`](crate::persist).
    pub written: Vec<PathBuf>,
}

impl RunReport {
    pub fn n_events(&self) -> u64 {
        self.accumulator.n_events()
    }

    /// Tasks completed across all workers.
    pub fn total_completed(&self) -> u64 {
        self.completions.values().sum()
    }

    /// Events simulated per second of wall-clock time.
    pub fn events_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_completed() as f64 / secs
        } else {
            0.0
        }
    }
}
