//! Worker threads for the distributed strategy.
//!
//! ```text
//!                  ┌──────────────┐  Work / Stop   ┌──────────┐
//!                  │              │ ─────────────▶ │ Worker 1 │──┐
//!                  │  Coordinator │                └──────────┘  │
//!                  │ (Dispatcher) │  Work / Stop   ┌──────────┐  │ Result
//!                  │              │ ─────────────▶ │ Worker 2 │──┤
//!                  └──────▲───────┘                └──────────┘  │
//!                         └──────────────────────────────────────┘
//! ```
//!
//! Each worker owns an inbox; all results share one channel back to the
//! coordinator. The coordinator never blocks on the result channel: when
//! nothing is waiting it checks for workers that exited early and sleeps
//! for the poll interval.

use crate::RunError;
use arbuckle_core::{Action, Event, StateMachine};
use arbuckle_dispatch::{Dispatcher, Step, WorkerError, WorkerLoop, WorkerState};
use arbuckle_engine::EngineFactory;
use arbuckle_messages::Message;
use arbuckle_types::{RunConfig, WorkerId};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use crossbeam::sync::WaitGroup;
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Handle to one worker thread.
struct WorkerHandle<'scope> {
    id: WorkerId,
    inbox: Sender<Message>,
    thread: ScopedJoinHandle<'scope, Result<u64, WorkerError>>,
}

/// The running worker threads of one distributed run.
pub(crate) struct WorkerPool<'scope> {
    workers: Vec<WorkerHandle<'scope>>,
    results: Receiver<Message>,
    /// Released once every worker has built its engine.
    ready: Option<WaitGroup>,
}

impl<'scope> WorkerPool<'scope> {
    /// Start one thread per worker identity.
    pub(crate) fn spawn<'env>(
        scope: &'scope Scope<'scope, 'env>,
        ids: &[WorkerId],
        config: &Arc<RunConfig>,
        factory: &'scope dyn EngineFactory,
    ) -> Self {
        let (result_tx, results) = channel::unbounded();
        let ready = WaitGroup::new();

        let workers = ids
            .iter()
            .map(|&id| {
                let (inbox, inbox_rx) = channel::unbounded();
                let outbox = result_tx.clone();
                let config = Arc::clone(config);
                let ready = ready.clone();

                let thread =
                    scope.spawn(move || run_worker(id, config, factory, inbox_rx, outbox, ready));
                WorkerHandle { id, inbox, thread }
            })
            .collect();

        Self {
            workers,
            results,
            ready: Some(ready),
        }
    }

    /// Drive `dispatcher` to completion, then stop and join every worker.
    pub(crate) fn coordinate(
        mut self,
        mut dispatcher: Dispatcher,
        poll_interval: Duration,
    ) -> Result<Dispatcher, RunError> {
        if let Some(ready) = self.ready.take() {
            ready.wait();
        }
        debug!(workers = self.workers.len(), "All workers ready");

        let outcome = self.drive(&mut dispatcher, poll_interval);
        match &outcome {
            Ok(()) => debug!(
                stopped = dispatcher.stopped_workers().count(),
                "Joining workers"
            ),
            Err(e) => {
                warn!(error = %e, "Stopping remaining workers");
                self.stop_live(&dispatcher);
            }
        }

        // Worker errors take precedence over the coordinator's outcome.
        self.join()?;
        outcome?;
        Ok(dispatcher)
    }

    fn drive(&self, dispatcher: &mut Dispatcher, poll_interval: Duration) -> Result<(), RunError> {
        let mut actions = dispatcher.handle(Event::Start);

        loop {
            let mut done = false;
            for action in actions.drain(..) {
                match action {
                    Action::Send { to, message } => self.send(to, message)?,
                    Action::Persist => done = true,
                    Action::Abort(reason) => return Err(RunError::Aborted(reason)),
                }
            }
            if done || dispatcher.is_done() {
                return Ok(());
            }

            actions = loop {
                match self.results.try_recv() {
                    Ok(Message::Result { worker, waveform }) => {
                        break dispatcher.handle(Event::ResultReceived {
                            from: worker,
                            waveform,
                        });
                    }
                    Ok(other) => {
                        warn!(message = other.type_name(), "Ignoring non-result message");
                    }
                    Err(TryRecvError::Empty) => {
                        self.check_exited(dispatcher)?;
                        thread::sleep(poll_interval);
                    }
                    Err(TryRecvError::Disconnected) => {
                        self.check_exited(dispatcher)?;
                        let id = dispatcher
                            .live_workers()
                            .next()
                            .unwrap_or(WorkerId::COORDINATOR);
                        return Err(RunError::WorkerLost(id));
                    }
                }
            };
        }
    }

    fn send(&self, to: WorkerId, message: Message) -> Result<(), RunError> {
        let handle = self
            .workers
            .iter()
            .find(|w| w.id == to)
            .ok_or(RunError::WorkerLost(to))?;
        debug!(worker = %to, message = message.type_name(), "Sending");
        handle
            .inbox
            .send(message)
            .map_err(|_| RunError::WorkerLost(to))
    }

    /// Fail if a worker the dispatcher still counts on has exited.
    fn check_exited(&self, dispatcher: &Dispatcher) -> Result<(), RunError> {
        for worker in &self.workers {
            if worker.thread.is_finished()
                && dispatcher.worker_state(worker.id) != Some(WorkerState::Stopped)
            {
                return Err(RunError::WorkerLost(worker.id));
            }
        }
        Ok(())
    }

    fn stop_live(&self, dispatcher: &Dispatcher) {
        for id in dispatcher.live_workers() {
            if let Some(worker) = self.workers.iter().find(|w| w.id == id) {
                // Fails only for workers that already exited.
                let _ = worker.inbox.send(Message::Stop);
            }
        }
    }

    /// Close every inbox and wait for the threads.
    fn join(self) -> Result<(), RunError> {
        let mut failure: Option<RunError> = None;

        for WorkerHandle { id, inbox, thread } in self.workers {
            drop(inbox);
            let error = match thread.join() {
                Ok(Ok(completed)) => {
                    debug!(worker = %id, completed, "Worker joined");
                    continue;
                }
                Ok(Err(source)) => RunError::WorkerFailed { worker: id, source },
                Err(_) => RunError::WorkerPanicked(id),
            };
            warn!(error = %error, "Worker did not finish cleanly");

            // Keep the first error that is not just a closed inbox.
            let is_disconnect = |e: &RunError| {
                matches!(
                    e,
                    RunError::WorkerFailed {
                        source: WorkerError::Disconnected,
                        ..
                    }
                )
            };
            let replace = match &failure {
                None => true,
                Some(current) => is_disconnect(current) && !is_disconnect(&error),
            };
            if replace {
                failure = Some(error);
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Body of one worker thread.
fn run_worker(
    id: WorkerId,
    config: Arc<RunConfig>,
    factory: &dyn EngineFactory,
    inbox: Receiver<Message>,
    outbox: Sender<Message>,
    ready: WaitGroup,
) -> Result<u64, WorkerError> {
    let engine = factory.build(&config, id)?;
    let mut worker = WorkerLoop::new(id, config, engine);
    worker.prepare()?;
    drop(ready);

    loop {
        let message = inbox.recv().map_err(|_| WorkerError::Disconnected)?;
        match worker.handle(message)? {
            Step::Reply(reply) => outbox.send(reply).map_err(|_| WorkerError::Disconnected)?,
            Step::Exit => {
                info!(worker = %id, completed = worker.completed(), "Worker finished");
                return Ok(worker.completed());
            }
        }
    }
}
