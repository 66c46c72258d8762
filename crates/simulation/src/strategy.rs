//! How a run's events get computed.
//!
//! Both strategies drive the same [`Dispatcher`]; they differ only in where
//! the worker loop runs.

use crate::pool::WorkerPool;
use crate::{RunError, RunReport};
use arbuckle_core::{Action, Event, StateMachine};
use arbuckle_dispatch::{Dispatcher, Step, WorkerError, WorkerLoop, DEFAULT_PROGRESS_INTERVAL};
use arbuckle_engine::EngineFactory;
use arbuckle_messages::Message;
use arbuckle_types::{RunConfig, WorkerId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default sleep between polls when no result is waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(200);

/// A way of running every event of a configuration.
pub trait DispatchStrategy {
    fn name(&self) -> &'static str;

    /// Pool size, coordinator included.
    fn participants(&self) -> usize;

    /// Compute all events and return the aggregates.
    ///
    /// Persisting is left to the caller, which owns the sink.
    fn run(
        &self,
        config: Arc<RunConfig>,
        factory: &dyn EngineFactory,
    ) -> Result<RunReport, RunError>;
}

/// Pick the strategy for a pool of `participants`.
///
/// A pool of one has no workers to dispatch to, so the coordinator computes
/// every event itself.
pub fn select_strategy(participants: usize, poll_interval: Duration) -> Box<dyn DispatchStrategy> {
    if participants <= 1 {
        Box::new(Direct::new())
    } else {
        Box::new(Distributed::new(participants).with_poll_interval(poll_interval))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Direct
// ═══════════════════════════════════════════════════════════════════════════

/// Computes every event on the calling thread.
///
/// The coordinator plays worker 1 itself, so setup diagnostics, the final
/// marker and the aggregates behave exactly as in a distributed run.
#[derive(Debug, Clone)]
pub struct Direct {
    progress_interval: u64,
}

impl Direct {
    pub fn new() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}

impl Default for Direct {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchStrategy for Direct {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn participants(&self) -> usize {
        1
    }

    fn run(
        &self,
        config: Arc<RunConfig>,
        factory: &dyn EngineFactory,
    ) -> Result<RunReport, RunError> {
        let started = Instant::now();
        let id = WorkerId::FIRST;
        let engine = factory.build(&config, id)?;
        let mut worker = WorkerLoop::new(id, Arc::clone(&config), engine);
        let failed = |source: WorkerError| RunError::WorkerFailed { worker: id, source };

        info!(n_events = config.n_events, "Starting direct run");
        worker.prepare().map_err(failed)?;

        let mut dispatcher = Dispatcher::new(config.n_events, config.n_bins(), [id])
            .with_progress_interval(self.progress_interval);
        let mut pending: VecDeque<Action> = dispatcher.handle(Event::Start).into();

        while let Some(action) = pending.pop_front() {
            match action {
                Action::Send { message, .. } => match worker.handle(message).map_err(failed)? {
                    Step::Reply(Message::Result { worker: from, waveform }) => {
                        pending.extend(
                            dispatcher.handle(Event::ResultReceived { from, waveform }),
                        );
                    }
                    Step::Reply(other) => {
                        debug!(message = other.type_name(), "Ignoring reply");
                    }
                    Step::Exit => {}
                },
                Action::Persist => {
                    debug!("Dispatcher done");
                }
                Action::Abort(reason) => return Err(RunError::Aborted(reason)),
            }
        }

        Ok(RunReport {
            strategy: self.name(),
            participants: 1,
            completions: dispatcher.completions().clone(),
            final_recipient: dispatcher.final_recipient(),
            elapsed: started.elapsed(),
            written: vec![],
            accumulator: dispatcher.into_accumulator(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Distributed
// ═══════════════════════════════════════════════════════════════════════════

/// One coordinator thread plus `participants - 1` worker threads.
#[derive(Debug, Clone)]
pub struct Distributed {
    participants: usize,
    poll_interval: Duration,
    progress_interval: u64,
}

impl Distributed {
    /// Pool of `participants`, coordinator included. At least two.
    pub fn new(participants: usize) -> Self {
        Self {
            participants: participants.max(2),
            poll_interval: DEFAULT_POLL_INTERVAL,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Sleep between polls when no result is waiting.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}

impl DispatchStrategy for Distributed {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn participants(&self) -> usize {
        self.participants
    }

    fn run(
        &self,
        config: Arc<RunConfig>,
        factory: &dyn EngineFactory,
    ) -> Result<RunReport, RunError> {
        let started = Instant::now();
        let pool_size = u32::try_from(self.participants)
            .map_err(|_| RunError::TooManyParticipants(self.participants))?;
        let workers: Vec<WorkerId> = WorkerId::workers(pool_size).collect();

        info!(
            n_events = config.n_events,
            workers = workers.len(),
            "Starting distributed run"
        );

        let dispatcher = Dispatcher::new(config.n_events, config.n_bins(), workers.iter().copied())
            .with_progress_interval(self.progress_interval);

        let dispatcher = std::thread::scope(|scope| {
            let pool = WorkerPool::spawn(scope, &workers, &config, factory);
            pool.coordinate(dispatcher, self.poll_interval)
        })?;

        Ok(RunReport {
            strategy: self.name(),
            participants: self.participants,
            completions: dispatcher.completions().clone(),
            final_recipient: dispatcher.final_recipient(),
            elapsed: started.elapsed(),
            written: vec![],
            accumulator: dispatcher.into_accumulator(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbuckle_test_helpers::{expected_sum, test_config, ScriptedFactory};
    use tracing_test::traced_test;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_pool_size_beyond_worker_ids() {
        let participants = u32::MAX as usize + 1;
        let err = Distributed::new(participants)
            .run(Arc::new(test_config(3, 4)), &ScriptedFactory::new())
            .unwrap_err();
        assert!(
            matches!(err, RunError::TooManyParticipants(n) if n == participants),
            "got {err:?}"
        );
    }

    #[test]
    fn test_select_strategy() {
        let poll = Duration::from_micros(50);
        assert_eq!(select_strategy(0, poll).name(), "direct");
        assert_eq!(select_strategy(1, poll).name(), "direct");

        let strategy = select_strategy(4, poll);
        assert_eq!(strategy.name(), "distributed");
        assert_eq!(strategy.participants(), 4);
    }

    #[traced_test]
    #[test]
    fn test_direct_run() {
        let config = Arc::new(test_config(5, 4));
        let factory = ScriptedFactory::new();
        let counters = factory.counters();

        let report = Direct::new().run(config, &factory).unwrap();

        assert_eq!(report.accumulator.sum_waveform(), &expected_sum(5, 4)[..]);
        assert_eq!(report.accumulator.histogram().len(), 5);
        assert_eq!(report.completions.get(&WorkerId::FIRST), Some(&5));
        assert_eq!(report.final_recipient, Some(WorkerId::FIRST));
        assert_eq!(counters.setup(), 1);
        assert_eq!(counters.finals(), 1);
        assert!(logs_contain("Starting direct run"));
    }

    #[test]
    fn test_direct_engine_failure() {
        let config = Arc::new(test_config(5, 4));
        let factory = ScriptedFactory::new().with_failing_worker(WorkerId::FIRST, 2);

        let err = Direct::new().run(config, &factory).unwrap_err();
        assert!(matches!(
            err,
            RunError::WorkerFailed {
                worker: WorkerId::FIRST,
                ..
            }
        ));
    }

    #[test]
    fn test_direct_wrong_length_aborts() {
        let config = Arc::new(test_config(3, 4));
        let factory = ScriptedFactory::new().with_wrong_length(WorkerId::FIRST, 2);

        let err = Direct::new().run(config, &factory).unwrap_err();
        assert!(matches!(err, RunError::Aborted(_)));
    }
}
